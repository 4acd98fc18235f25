//! Splitting blobs into per-frame chunks.
//!
//! A frame carries at most [`MAX_DATA_LEN`] data bytes including the
//! sub-header, so photos and programs travel as numbered chunks. Chunk numbers
//! start at 1 and every chunk repeats the total count. Empty input still
//! produces one empty chunk.

use bytes::Bytes;

use crate::error::{FrameError, Result};
use crate::format::MAX_DATA_LEN;
use crate::message::{PhotoData, ProgramResult, ProgramUpload};
use crate::schema::{
    PHOTO_SUB_HEADER_LEN, PROGRAM_RESULT_SUB_HEADER_LEN, PROGRAM_UPLOAD_SUB_HEADER_LEN,
};

/// Photo bytes carried by one full chunk.
pub const PHOTO_CHUNK_LEN: usize = MAX_DATA_LEN - PHOTO_SUB_HEADER_LEN as usize;

/// Split a photo into [`PhotoData`] chunks.
pub fn photo_chunks(index: u16, file: impl Into<Bytes>) -> Result<Vec<PhotoData>> {
    let file = file.into();
    let file_size = u32::try_from(file.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: file.len(),
        max: u32::MAX as usize,
    })?;

    Ok(split(&file, PHOTO_CHUNK_LEN)?
        .into_iter()
        .map(|(chunk, count, data)| PhotoData::new(index, chunk, count, file_size, data))
        .collect())
}

/// Split a program into [`ProgramUpload`] chunks, each carrying `name`.
pub fn program_upload_chunks(
    index: u16,
    name: &str,
    program: impl Into<Bytes>,
) -> Result<Vec<ProgramUpload>> {
    let per_chunk = room_after(PROGRAM_UPLOAD_SUB_HEADER_LEN, name)?;
    Ok(split(&program.into(), per_chunk)?
        .into_iter()
        .map(|(chunk, count, data)| ProgramUpload::new(index, chunk, count, name, data))
        .collect())
}

/// Split a program's output into [`ProgramResult`] chunks, each carrying `name` and `exit_code`.
pub fn program_result_chunks(
    index: u16,
    name: &str,
    exit_code: i8,
    output: impl Into<Bytes>,
) -> Result<Vec<ProgramResult>> {
    let per_chunk = room_after(PROGRAM_RESULT_SUB_HEADER_LEN, name)?;
    Ok(split(&output.into(), per_chunk)?
        .into_iter()
        .map(|(chunk, count, data)| {
            ProgramResult::new(index, chunk, count, exit_code, name, data)
        })
        .collect())
}

// Data bytes left per frame once the sub-header and name are accounted for.
fn room_after(sub_header_len: u8, name: &str) -> Result<usize> {
    let used = sub_header_len as usize + name.len();
    if used >= MAX_DATA_LEN {
        return Err(FrameError::PayloadTooLarge {
            size: used,
            max: MAX_DATA_LEN - 1,
        });
    }
    Ok(MAX_DATA_LEN - used)
}

fn split(blob: &Bytes, per_chunk: usize) -> Result<Vec<(u16, u16, Bytes)>> {
    let count = blob.len().div_ceil(per_chunk).max(1);
    let count = u16::try_from(count).map_err(|_| FrameError::PayloadTooLarge {
        size: blob.len(),
        max: per_chunk * u16::MAX as usize,
    })?;

    Ok((1..=count)
        .map(|chunk| {
            let start = (chunk as usize - 1) * per_chunk;
            let end = (start + per_chunk).min(blob.len());
            (chunk, count, blob.slice(start..end))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{data_length, Encoder};
    use crate::message::Payload;

    #[test]
    fn photo_chunks_cover_file() {
        let file: Vec<u8> = (0..600u32).map(|i| i as u8).collect();
        let chunks = photo_chunks(7, file.clone()).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].data.len(), PHOTO_CHUNK_LEN);
        assert_eq!(chunks[2].data.len(), 600 - 2 * PHOTO_CHUNK_LEN);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, 7);
            assert_eq!(chunk.chunk as usize, i + 1);
            assert_eq!(chunk.chunk_count, 3);
            assert_eq!(chunk.file_size, 600);
        }

        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.data.iter().copied()).collect();
        assert_eq!(joined, file);
    }

    #[test]
    fn full_photo_chunk_fills_frame() {
        let chunks = photo_chunks(1, vec![0u8; PHOTO_CHUNK_LEN]).unwrap();
        assert_eq!(chunks.len(), 1);

        let len = data_length(&Payload::PhotoData(chunks[0].clone())).unwrap();
        assert_eq!(len as usize, MAX_DATA_LEN);
    }

    #[test]
    fn empty_input_yields_one_chunk() {
        let chunks = program_result_chunks(2, "fsck", -1, Bytes::new()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk, 1);
        assert_eq!(chunks[0].chunk_count, 1);
        assert_eq!(chunks[0].exit_code, -1);
        assert!(chunks[0].program_data.is_empty());
    }

    #[test]
    fn result_chunk_size_depends_on_name() {
        let name = "report.sh";
        let per_chunk = MAX_DATA_LEN - (11 + name.len());
        let output = vec![b'x'; per_chunk * 2 + 1];

        let chunks = program_result_chunks(3, name, 0, output).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].program_data.len(), per_chunk);
        assert_eq!(chunks[2].program_data.len(), 1);
        let encoder = Encoder::with_timestamp(0);
        for chunk in &chunks {
            let frame = encoder.program_result(chunk).unwrap();
            assert!(frame.len() <= crate::format::MAX_FRAME_SIZE);
        }
    }

    #[test]
    fn upload_chunks_encode() {
        let program = vec![0x90u8; 1000];
        let chunks = program_upload_chunks(4, "payload.bin", program).unwrap();
        let encoder = Encoder::with_timestamp(0);

        assert!(chunks.iter().all(|c| c.program_name == "payload.bin"));
        assert!(chunks
            .iter()
            .all(|c| c.chunk_count as usize == chunks.len()));
        for chunk in &chunks {
            encoder.program_upload(chunk).unwrap();
        }
    }

    #[test]
    fn name_without_room_is_rejected() {
        let name = "n".repeat(MAX_DATA_LEN - 10);
        let err = program_upload_chunks(1, &name, vec![1u8]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));

        let name = "n".repeat(MAX_DATA_LEN - 12);
        assert_eq!(
            program_result_chunks(1, &name, 0, vec![1u8, 2])
                .unwrap()
                .len(),
            2
        );
    }
}
