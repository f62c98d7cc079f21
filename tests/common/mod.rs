// Shared fixture: a two-class program image plus its source files.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const IMAGE: &str = r#"{
    "entry": "Main:main",
    "classes": [
        {
            "name": "Main",
            "file": "main.obs",
            "instance": [{"name": "count", "kind": "int", "slot": 0}],
            "class": [{"name": "total", "kind": "int", "slot": 0}],
            "methods": [{
                "name": "main",
                "params": "args:String[]",
                "locals": [
                    {"name": "args", "kind": "object[]", "slot": 0},
                    {"name": "a", "kind": "int", "slot": 1},
                    {"name": "f", "kind": "float", "slot": 2},
                    {"name": "grid", "kind": "int[]", "slot": 3},
                    {"name": "p", "kind": "object", "slot": 4},
                    {"name": "name", "kind": "object", "slot": 5}
                ],
                "code": [
                    {"line": 5, "op": "store", "slot": 1, "value": {"int": 5}},
                    {"line": 5, "op": "store_static", "class": "Main", "field": "total", "value": {"int": 42}},
                    {"line": 6, "op": "store", "slot": 2, "value": {"float": 2.5}},
                    {"line": 7, "op": "new_array", "slot": 3, "kind": "int", "dims": [2, 3]},
                    {"line": 8, "op": "store_element", "slot": 3, "index": [1, 2], "value": {"int": 7}},
                    {"line": 9, "op": "new_object", "slot": 4, "class": "Point"},
                    {"line": 10, "op": "call", "method": "Point:move", "receiver": {"local": 4}, "args": [{"int": 3}]},
                    {"line": 10, "op": "nop"},
                    {"line": 11, "op": "new_string", "slot": 5, "value": "hello"},
                    {"line": 11, "op": "call", "method": "Shapes:build"},
                    {"line": 12, "op": "return"}
                ]
            }]
        },
        {
            "name": "Point",
            "file": "point.obs",
            "instance": [{"name": "x", "kind": "int", "slot": 0}],
            "methods": [{
                "name": "move",
                "params": "dx:Int",
                "locals": [
                    {"name": "dx", "kind": "int", "slot": 0},
                    {"name": "y", "kind": "int", "slot": 1}
                ],
                "code": [
                    {"line": 3, "op": "store_field", "object": "self", "field": "x", "value": {"local": 0}},
                    {"line": 4, "op": "nop"},
                    {"line": 5, "op": "return"}
                ]
            }]
        },
        {
            "name": "Shapes",
            "file": "shapes.obs",
            "methods": [{
                "name": "build",
                "has_and_or": true,
                "locals": [
                    {"name": "a", "kind": "int", "slot": 0},
                    {"name": "fs", "kind": "float[]", "slot": 1},
                    {"name": "bs", "kind": "byte[]", "slot": 2},
                    {"name": "cs", "kind": "char[]", "slot": 3},
                    {"name": "os", "kind": "object[]", "slot": 4},
                    {"name": "q", "kind": "object", "slot": 5},
                    {"name": "g", "kind": "function", "slot": 6},
                    {"name": "n", "kind": "int", "slot": 8}
                ],
                "code": [
                    {"line": 3, "op": "store", "slot": 0, "value": {"int": 11}},
                    {"line": 4, "op": "new_array", "slot": 1, "kind": "float", "dims": [3]},
                    {"line": 4, "op": "store_element", "slot": 1, "index": [2], "value": {"float": 2.5}},
                    {"line": 5, "op": "new_array", "slot": 2, "kind": "byte", "dims": [10]},
                    {"line": 5, "op": "store_element", "slot": 2, "index": [9], "value": {"int": 200}},
                    {"line": 6, "op": "new_array", "slot": 3, "kind": "char", "dims": [3]},
                    {"line": 6, "op": "store_element", "slot": 3, "index": [2], "value": {"char": "z"}},
                    {"line": 7, "op": "new_array", "slot": 4, "kind": "object", "dims": [2]},
                    {"line": 8, "op": "new_object", "slot": 5, "class": "Point"},
                    {"line": 8, "op": "store_field", "object": {"local": 5}, "field": "x", "value": {"int": 9}},
                    {"line": 8, "op": "store_element", "slot": 4, "index": [1], "value": {"local": 5}},
                    {"line": 9, "op": "store_function", "slot": 6, "method": "Point:move"},
                    {"line": 9, "op": "store", "slot": 8, "value": {"int": 4}},
                    {"line": 10, "op": "return"}
                ]
            }]
        }
    ]
}"#;

pub const MAIN_SOURCE: &str = "\
# demo program
class Main {
    static total : Int;
    function : Main(args : String[]) ~ Nil {
        a := 5; total := 42;
        f := 2.5;
        grid := Int->New[2, 3];
        grid[1, 2] := 7;
        p := Point->New();
        p->Move(3);
        name := \"hello\"; Shapes->Build();
    }
}
";

pub const POINT_SOURCE: &str = "\
class Point {
    method : public : Move(dx : Int) ~ Nil {
        @x := dx;
        y := 0;
    }
    @x : Int;
}
";

pub const SHAPES_SOURCE: &str = "\
class Shapes {
    function : Build() ~ Nil {
        a := 11;
        fs := Float->New[3]; fs[2] := 2.5;
        bs := Byte->New[10]; bs[9] := 200;
        cs := Char->New[3]; cs[2] := 'z';
        os := Point->New[2];
        q := Point->New(); q->x := 9; os[1] := q;
        g := Point->Move(Int) ~ Nil; n := 4;
    }
}
";

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A program image and its sources in a fresh temp directory, removed on drop.
pub struct Project {
    pub dir: PathBuf,
}

impl Project {
    pub fn new(name: &str) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "svdb_{name}_{}_{id}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create project dir");
        fs::write(dir.join("main.json"), IMAGE).expect("write image");
        fs::write(dir.join("main.obs"), MAIN_SOURCE).expect("write main source");
        fs::write(dir.join("point.obs"), POINT_SOURCE).expect("write point source");
        fs::write(dir.join("shapes.obs"), SHAPES_SOURCE).expect("write shapes source");
        Self { dir }
    }

    pub fn image(&self) -> PathBuf {
        self.dir.join("main.json")
    }

    pub fn src(&self) -> String {
        self.dir.to_string_lossy().into_owned()
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}
