//! Word-addressed heap reproducing the VM's object, array and class memory
//! layouts.
//!
//! Blocks are addressed by opaque non-zero pointer words; `NIL` is zero.
//! Array blocks start with `[total, dims, size_0 .. size_n]` followed by the
//! packed element data. Object blocks carry their class tag in word 0.

use super::program::{ClassId, ElementKind};

pub type Word = u64;

pub const NIL: Word = 0;
pub const WORD_BYTES: usize = 8;

/// Words occupied by one float array element.
pub const FLOAT_STRIDE: usize = 2;

const ADDR_SHIFT: u32 = 4;
const ARRAY_HEADER: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Object,
    Array(ElementKind),
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexError {
    DimensionMismatch,
    OutOfBounds,
}

#[derive(Debug)]
struct Block {
    kind: BlockKind,
    words: Vec<Word>,
}

fn address(index: usize) -> Word {
    ((index as Word) + 1) << ADDR_SHIFT
}

fn block_index(ptr: Word) -> Option<usize> {
    if ptr == NIL || ptr & ((1 << ADDR_SHIFT) - 1) != 0 {
        return None;
    }
    usize::try_from((ptr >> ADDR_SHIFT) - 1).ok()
}

/// Data words backing `len` elements of `kind`.
pub fn data_words(kind: ElementKind, len: usize) -> usize {
    match kind {
        ElementKind::Byte => len.div_ceil(8),
        ElementKind::Char => len.div_ceil(2),
        ElementKind::Float => len * FLOAT_STRIDE,
        ElementKind::Int | ElementKind::Object => len,
    }
}

#[derive(Debug, Default)]
pub struct Heap {
    blocks: Vec<Option<Block>>,
    statics: Vec<Word>,
    allocated: usize,
    collected: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, kind: BlockKind, words: Vec<Word>) -> Word {
        self.allocated += words.len() * WORD_BYTES;
        self.blocks.push(Some(Block { kind, words }));
        address(self.blocks.len() - 1)
    }

    pub fn alloc_object(&mut self, class: ClassId, fields: usize) -> Word {
        let mut words = vec![NIL; 1 + fields];
        words[0] = class as Word;
        self.alloc(BlockKind::Object, words)
    }

    pub fn alloc_array(&mut self, kind: ElementKind, dims: &[usize]) -> Word {
        let len: usize = dims.iter().product();
        let data = data_words(kind, len);
        let mut words = Vec::with_capacity(ARRAY_HEADER + dims.len() + data);
        words.push(len as Word);
        words.push(dims.len() as Word);
        words.extend(dims.iter().map(|&size| size as Word));
        words.resize(words.len() + data, 0);
        self.alloc(BlockKind::Array(kind), words)
    }

    /// Allocates the shared static block of `class`.
    pub fn alloc_static(&mut self, class: ClassId, size: usize) -> Word {
        let ptr = self.alloc(BlockKind::Static, vec![NIL; size]);
        if self.statics.len() <= class {
            self.statics.resize(class + 1, NIL);
        }
        self.statics[class] = ptr;
        ptr
    }

    pub fn class_memory(&self, class: ClassId) -> Option<Word> {
        self.statics.get(class).copied().filter(|&ptr| ptr != NIL)
    }

    pub fn free(&mut self, ptr: Word) -> bool {
        let Some(slot) = block_index(ptr).and_then(|index| self.blocks.get_mut(index)) else {
            return false;
        };
        match slot.take() {
            Some(block) => {
                self.collected += block.words.len() * WORD_BYTES;
                true
            }
            None => false,
        }
    }

    fn get(&self, ptr: Word) -> Option<&Block> {
        self.blocks.get(block_index(ptr)?)?.as_ref()
    }

    fn get_mut(&mut self, ptr: Word) -> Option<&mut Block> {
        self.blocks.get_mut(block_index(ptr)?)?.as_mut()
    }

    pub fn block(&self, ptr: Word) -> Option<&[Word]> {
        self.get(ptr).map(|block| block.words.as_slice())
    }

    pub fn block_mut(&mut self, ptr: Word) -> Option<&mut [Word]> {
        self.get_mut(ptr).map(|block| block.words.as_mut_slice())
    }

    pub fn kind_of(&self, ptr: Word) -> Option<BlockKind> {
        self.get(ptr).map(|block| block.kind)
    }

    /// Class of a heap object, recovered from its tag word.
    pub fn class_of(&self, ptr: Word) -> Option<ClassId> {
        let block = self.get(ptr)?;
        match block.kind {
            BlockKind::Object => block
                .words
                .first()
                .and_then(|&tag| usize::try_from(tag).ok()),
            BlockKind::Array(_) | BlockKind::Static => None,
        }
    }

    pub fn array(&self, ptr: Word) -> Option<ArrayView<'_>> {
        ArrayView::parse(self.block(ptr)?)
    }

    /// Writes one element, packing narrow kinds into their backing word.
    pub fn store_element(&mut self, ptr: Word, indices: &[i64], value: Word) -> Option<()> {
        let Some(BlockKind::Array(kind)) = self.kind_of(ptr) else {
            return None;
        };
        let (offset, index) = {
            let view = self.array(ptr)?;
            (view.data_offset(), view.linear_index(indices).ok()?)
        };
        let data = self.block_mut(ptr)?.get_mut(offset..)?;
        match kind {
            ElementKind::Byte => pack(data.get_mut(index / 8)?, (index % 8) * 8, 0xff, value),
            ElementKind::Char => pack(data.get_mut(index / 2)?, (index % 2) * 32, 0xffff_ffff, value),
            ElementKind::Float => *data.get_mut(index * FLOAT_STRIDE)? = value,
            ElementKind::Int | ElementKind::Object => *data.get_mut(index)? = value,
        }
        Some(())
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated
    }

    pub fn collected_bytes(&self) -> usize {
        self.collected
    }
}

fn pack(word: &mut Word, shift: usize, mask: Word, value: Word) {
    *word = (*word & !(mask << shift)) | ((value & mask) << shift);
}

/// Bounds-checked view over an array block.
#[derive(Debug, Clone, Copy)]
pub struct ArrayView<'a> {
    len: usize,
    dims: &'a [Word],
    data: &'a [Word],
}

impl<'a> ArrayView<'a> {
    pub fn parse(words: &'a [Word]) -> Option<Self> {
        let (&len, rest) = words.split_first()?;
        let (&count, rest) = rest.split_first()?;
        let count = usize::try_from(count).ok()?;
        if rest.len() < count {
            return None;
        }
        let (dims, data) = rest.split_at(count);
        Some(Self {
            len: usize::try_from(len).ok()?,
            dims,
            data,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dimensions(&self) -> usize {
        self.dims.len()
    }

    pub fn dimension_sizes(&self) -> impl Iterator<Item = usize> + 'a {
        self.dims.iter().map(|&size| size as usize)
    }

    pub fn data_offset(&self) -> usize {
        ARRAY_HEADER + self.dims.len()
    }

    /// Row-major composite index, most significant dimension first, checked
    /// against the total element count.
    pub fn linear_index(&self, indices: &[i64]) -> Result<usize, IndexError> {
        if indices.len() != self.dims.len() {
            return Err(IndexError::DimensionMismatch);
        }
        let mut composite: i64 = 0;
        for (&index, &size) in indices.iter().zip(self.dims) {
            let size = i64::try_from(size).map_err(|_| IndexError::OutOfBounds)?;
            composite = composite
                .checked_mul(size)
                .and_then(|value| value.checked_add(index))
                .ok_or(IndexError::OutOfBounds)?;
        }
        match usize::try_from(composite) {
            Ok(index) if index < self.len => Ok(index),
            _ => Err(IndexError::OutOfBounds),
        }
    }

    fn in_range(&self, index: usize) -> Option<()> {
        (index < self.len).then_some(())
    }

    pub fn word(&self, index: usize) -> Option<Word> {
        self.in_range(index)?;
        self.data.get(index).copied()
    }

    pub fn byte(&self, index: usize) -> Option<u8> {
        self.in_range(index)?;
        let word = self.data.get(index / 8)?;
        Some((word >> ((index % 8) * 8)) as u8)
    }

    pub fn char_code(&self, index: usize) -> Option<u32> {
        self.in_range(index)?;
        let word = self.data.get(index / 2)?;
        Some((word >> ((index % 2) * 32)) as u32)
    }

    pub fn float(&self, index: usize) -> Option<f64> {
        self.in_range(index)?;
        self.data.get(index * FLOAT_STRIDE).map(|&bits| f64::from_bits(bits))
    }

    /// Contents of a char array, stopping at the first NUL.
    pub fn text(&self) -> String {
        (0..self.len)
            .map_while(|index| self.char_code(index))
            .take_while(|&code| code != 0)
            .map(|code| char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_dimensional_index_is_row_major() {
        let mut heap = Heap::new();
        let ptr = heap.alloc_array(ElementKind::Int, &[2, 3]);
        let view = heap.array(ptr).unwrap();
        assert_eq!(view.len(), 6);
        assert_eq!(view.dimension_sizes().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(view.linear_index(&[1, 2]), Ok(5));
        assert_eq!(view.linear_index(&[0, 1]), Ok(1));
        assert_eq!(view.linear_index(&[2, 0]), Err(IndexError::OutOfBounds));
        assert_eq!(view.linear_index(&[-1, 0]), Err(IndexError::OutOfBounds));
        assert_eq!(view.linear_index(&[1]), Err(IndexError::DimensionMismatch));
    }

    #[test]
    fn narrow_elements_share_words() {
        let mut heap = Heap::new();
        let bytes = heap.alloc_array(ElementKind::Byte, &[10]);
        heap.store_element(bytes, &[0], 0x41).unwrap();
        heap.store_element(bytes, &[9], 0x1ff).unwrap();
        let view = heap.array(bytes).unwrap();
        assert_eq!(view.data_offset(), 3);
        assert_eq!(heap.block(bytes).unwrap().len(), 3 + 2);
        assert_eq!(view.byte(0), Some(0x41));
        assert_eq!(view.byte(9), Some(0xff));
        assert_eq!(view.byte(10), None);

        let chars = heap.alloc_array(ElementKind::Char, &[3]);
        for (i, ch) in "hey".chars().enumerate() {
            heap.store_element(chars, &[i as i64], ch as Word).unwrap();
        }
        assert_eq!(heap.array(chars).unwrap().text(), "hey");
    }

    #[test]
    fn float_elements_use_two_words() {
        let mut heap = Heap::new();
        let ptr = heap.alloc_array(ElementKind::Float, &[2]);
        heap.store_element(ptr, &[1], 2.5f64.to_bits()).unwrap();
        assert_eq!(heap.block(ptr).unwrap().len(), 3 + 4);
        assert_eq!(heap.block(ptr).unwrap()[3 + 2], 2.5f64.to_bits());
        assert_eq!(heap.array(ptr).unwrap().float(1), Some(2.5));
    }

    #[test]
    fn objects_carry_their_class_and_counters_track_frees() {
        let mut heap = Heap::new();
        let obj = heap.alloc_object(3, 2);
        assert_eq!(heap.class_of(obj), Some(3));
        assert_eq!(heap.allocated_bytes(), 3 * WORD_BYTES);
        assert!(heap.free(obj));
        assert!(!heap.free(obj));
        assert_eq!(heap.class_of(obj), None);
        assert_eq!(heap.collected_bytes(), 3 * WORD_BYTES);
        assert_eq!(heap.block(NIL), None);
    }
}
