//! PS-X EXE sideloading.
//!
//! Parses the 2KB executable header from an in-memory image; reading the
//! file off disk is the caller's business. The text segment and register
//! seeds are applied to a running machine with
//! [`Bus::sideload_executable`](crate::psx::Bus::sideload_executable),
//! typically once the BIOS has finished initializing the console.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{EmuError, Result};

const HEADER_SIZE: usize = 0x800;
const MAGIC: &[u8; 8] = b"PS-X EXE";

/// A parsed executable image.
pub struct Executable {
    pub initial_pc: u32,
    pub initial_gp: u32,
    pub initial_sp: u32,
    pub text_base: u32,
    pub text: Vec<u8>,
}

impl Executable {
    /// Parse a raw PS-X EXE image.
    pub fn parse(image: &[u8]) -> Result<Executable> {
        if image.len() < HEADER_SIZE {
            return Err(EmuError::BadExecutable(format!(
                "image is {} bytes, smaller than the header",
                image.len()
            )));
        }

        if &image[0..8] != MAGIC {
            return Err(EmuError::BadExecutable("bad magic number".to_string()));
        }

        let word = |offset: usize| LittleEndian::read_u32(&image[offset..offset + 4]);

        let initial_pc = word(0x10);
        let initial_gp = word(0x14);
        let text_base = word(0x18);
        let text_size = word(0x1c) as usize;
        let sp_base = word(0x30);
        let sp_offset = word(0x34);

        if image.len() < HEADER_SIZE + text_size {
            return Err(EmuError::BadExecutable(format!(
                "text segment of {} bytes exceeds the image",
                text_size
            )));
        }

        Ok(Executable {
            initial_pc,
            initial_gp,
            initial_sp: sp_base.wrapping_add(sp_offset),
            text_base,
            text: image[HEADER_SIZE..HEADER_SIZE + text_size].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> Vec<u8> {
        let mut image = vec![0u8; HEADER_SIZE + 8];

        image[0..8].copy_from_slice(MAGIC);
        LittleEndian::write_u32(&mut image[0x10..], 0x8001_0000);
        LittleEndian::write_u32(&mut image[0x14..], 0x8002_0000);
        LittleEndian::write_u32(&mut image[0x18..], 0x8001_0000);
        LittleEndian::write_u32(&mut image[0x1c..], 8);
        LittleEndian::write_u32(&mut image[0x30..], 0x801f_f000);
        LittleEndian::write_u32(&mut image[0x34..], 0x100);
        image[HEADER_SIZE] = 0xaa;

        image
    }

    #[test]
    fn parses_header_fields() {
        let exe = Executable::parse(&sample_image()).unwrap();

        assert_eq!(exe.initial_pc, 0x8001_0000);
        assert_eq!(exe.initial_gp, 0x8002_0000);
        assert_eq!(exe.initial_sp, 0x801f_f100);
        assert_eq!(exe.text_base, 0x8001_0000);
        assert_eq!(exe.text, vec![0xaa, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut image = sample_image();
        image[0] = b'X';

        assert!(Executable::parse(&image).is_err());
    }

    #[test]
    fn rejects_truncated_text() {
        let mut image = sample_image();
        LittleEndian::write_u32(&mut image[0x1c..], 0x1000);

        assert!(Executable::parse(&image).is_err());
    }
}
