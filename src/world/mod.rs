//! Decoded world data: block registry, chunk sections and the column map
//! the chunk handler writes into. Rendering consumes these; nothing here
//! draws anything.

use std::collections::HashMap;

use crate::error::DecodeError;
use crate::protocol::packet::PacketReader;

pub const SECTION_WIDTH: usize = 16;
/// Cells in one 16x16x16 section.
pub const SECTION_BLOCK_COUNT: usize = 4096;

/// Default world height for 1.19.x dimensions: 384 blocks.
pub const DEFAULT_HEIGHT_IN_SECTIONS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub is_air: bool,
}

impl Block {
    pub const AIR: Block = Block { is_air: true };
}

/// Resolves global block-state ids to concrete blocks. A real registry is
/// loaded from data dumps by the asset layer; here id 0 is air and
/// everything else is solid.
#[derive(Debug, Default)]
pub struct BlockRegistry;

impl BlockRegistry {
    pub fn block_for(&self, global_id: i32) -> Block {
        Block {
            is_air: global_id == 0,
        }
    }
}

/// Extracts a `bits`-wide unsigned field at absolute bit `offset` from a
/// big-endian packed word stream. A field may straddle two words: high
/// bits come from the first word, low bits from the second, so callers
/// append one spare zero word to keep the final read in bounds.
fn extract_bits(words: &[u64], offset: usize, bits: usize) -> u64 {
    debug_assert!(bits >= 1 && bits <= 32);
    let pos = offset / 64;
    let off = offset % 64;
    let first_len = bits.min(64 - off);
    let first = (words[pos] >> (64 - off - first_len)) & ((1u64 << first_len) - 1);
    let rest = bits - first_len;
    if rest == 0 {
        first
    } else {
        let second = (words[pos + 1] >> (64 - rest)) & ((1u64 << rest) - 1);
        first << rest | second
    }
}

/// One 16x16x16 sub-volume of a chunk column. Flat index order is
/// z*256 + x*16 + y, which downstream consumers rely on.
#[derive(Debug, Clone)]
pub struct ChunkSection {
    blocks: Box<[Block; SECTION_BLOCK_COUNT]>,
}

impl ChunkSection {
    pub fn empty() -> Self {
        Self {
            blocks: Box::new([Block::AIR; SECTION_BLOCK_COUNT]),
        }
    }

    pub fn block_at(&self, x: usize, y: usize, z: usize) -> Block {
        debug_assert!(x < SECTION_WIDTH && y < SECTION_WIDTH && z < SECTION_WIDTH);
        self.blocks[z * 256 + x * 16 + y]
    }

    pub fn is_air_at(&self, x: i32, y: i32, z: i32) -> bool {
        if x < 0 || y < 0 || z < 0 || x >= 16 || y >= 16 || z >= 16 {
            true
        } else {
            self.block_at(x as usize, y as usize, z as usize).is_air
        }
    }

    /// Decodes one section from chunk data: i16 block count, the block
    /// state palette container, then the biome container (consumed only
    /// to keep the reader aligned for the next section).
    pub fn decode(
        reader: &mut PacketReader<'_>,
        registry: &BlockRegistry,
    ) -> Result<Self, DecodeError> {
        let _block_count = reader.read_i16()?;
        let mut section = ChunkSection::empty();
        section.decode_block_states(reader, registry)?;
        consume_biomes(reader)?;
        Ok(section)
    }

    fn decode_block_states(
        &mut self,
        reader: &mut PacketReader<'_>,
        registry: &BlockRegistry,
    ) -> Result<(), DecodeError> {
        let mut bits_per_entry = reader.read_u8()?;

        if bits_per_entry == 0 {
            // Single-value encoding: one global id, no packed words. The
            // data array length field is still present and must be
            // consumed or the outer reader desynchronizes.
            let value = reader.read_varint()?;
            let block = registry.block_for(value);
            self.blocks.fill(block);
            let _data_length = reader.read_varint()?;
            return Ok(());
        }

        let palette = if bits_per_entry <= 8 {
            if bits_per_entry < 4 {
                bits_per_entry = 4;
            }
            let palette_length = reader.read_varint()?;
            if palette_length < 0 {
                return Err(DecodeError::InvalidPaletteLength(palette_length));
            }
            let mut palette = Vec::with_capacity(palette_length as usize);
            for _ in 0..palette_length {
                palette.push(reader.read_varint()?);
            }
            Some(palette)
        } else if bits_per_entry <= 15 {
            // Direct encoding: entries are raw global ids.
            None
        } else {
            return Err(DecodeError::InvalidBitsPerEntry(bits_per_entry));
        };

        let words = read_packed_words(reader, SECTION_BLOCK_COUNT, bits_per_entry as usize)?;

        for index in 0..SECTION_BLOCK_COUNT {
            let entry = extract_bits(&words, index * bits_per_entry as usize, bits_per_entry as usize);
            let global_id = match &palette {
                Some(palette) => {
                    *palette
                        .get(entry as usize)
                        .ok_or(DecodeError::PaletteIndexOutOfRange {
                            index: entry as usize,
                            palette_len: palette.len(),
                        })?
                }
                None => entry as i32,
            };
            self.blocks[index] = registry.block_for(global_id);
        }
        Ok(())
    }
}

/// Reads the VarInt-counted packed word array for `cells` entries of
/// `bits` width, verifying the declared count covers every cell and
/// appending the spare zero word for the final straddling read.
fn read_packed_words(
    reader: &mut PacketReader<'_>,
    cells: usize,
    bits: usize,
) -> Result<Vec<u64>, DecodeError> {
    let declared = reader.read_varint()?;
    if declared < 0 {
        return Err(DecodeError::InvalidDataArrayLength(declared));
    }
    let need = (cells * bits + 63) / 64;
    if (declared as usize) < need {
        return Err(DecodeError::ShortDataArray {
            got: declared as usize,
            need,
        });
    }
    let mut words = Vec::with_capacity(declared as usize + 1);
    for _ in 0..declared {
        words.push(reader.read_u64()?);
    }
    words.push(0);
    Ok(words)
}

/// The biome container mirrors the block one at 64 cells with smaller
/// widths. Values are not kept; this only advances the reader.
fn consume_biomes(reader: &mut PacketReader<'_>) -> Result<(), DecodeError> {
    let bits_per_entry = reader.read_u8()?;
    if bits_per_entry == 0 {
        let _value = reader.read_varint()?;
        let _data_length = reader.read_varint()?;
        return Ok(());
    }
    if bits_per_entry <= 3 {
        let palette_length = reader.read_varint()?;
        if palette_length < 0 {
            return Err(DecodeError::InvalidPaletteLength(palette_length));
        }
        for _ in 0..palette_length {
            let _ = reader.read_varint()?;
        }
    } else if bits_per_entry > 6 {
        return Err(DecodeError::InvalidBitsPerEntry(bits_per_entry));
    }
    let declared = reader.read_varint()?;
    if declared < 0 {
        return Err(DecodeError::InvalidDataArrayLength(declared));
    }
    for _ in 0..declared {
        let _ = reader.read_u64()?;
    }
    Ok(())
}

/// Vertical stack of sections for one (chunk_x, chunk_z).
pub struct ChunkColumn {
    sections: Vec<ChunkSection>,
}

impl ChunkColumn {
    fn new(height_in_sections: usize) -> Self {
        Self {
            sections: (0..height_in_sections).map(|_| ChunkSection::empty()).collect(),
        }
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn section(&self, index: usize) -> Option<&ChunkSection> {
        self.sections.get(index)
    }

    pub fn replace_section(&mut self, index: usize, section: ChunkSection) {
        if let Some(slot) = self.sections.get_mut(index) {
            *slot = section;
        }
    }
}

/// Chunk columns keyed by coordinates, created on first access. The chunk
/// handler writes decoded sections through this.
pub struct World {
    height_in_sections: usize,
    columns: HashMap<u64, ChunkColumn>,
    registry: BlockRegistry,
}

impl World {
    pub fn new(height_in_sections: usize) -> Self {
        Self {
            height_in_sections,
            columns: HashMap::new(),
            registry: BlockRegistry,
        }
    }

    pub fn height_in_sections(&self) -> usize {
        self.height_in_sections
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn try_column(&self, x: i32, z: i32) -> Option<&ChunkColumn> {
        self.columns.get(&Self::column_key(x, z))
    }

    pub fn column_mut(&mut self, x: i32, z: i32) -> &mut ChunkColumn {
        let height = self.height_in_sections;
        self.columns
            .entry(Self::column_key(x, z))
            .or_insert_with(|| ChunkColumn::new(height))
    }

    pub fn unload(&mut self, x: i32, z: i32) {
        self.columns.remove(&Self::column_key(x, z));
    }

    pub fn loaded_column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_key(x: i32, z: i32) -> u64 {
        (x as u32 as u64) << 32 | z as u32 as u64
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(DEFAULT_HEIGHT_IN_SECTIONS)
    }
}
