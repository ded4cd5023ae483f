use std::sync::mpsc;

use crate::error::FxError;

/// Copies `rows` rows from a pitched source into a tightly packed destination.
///
/// Each row advances the source by `src_pitch` and the destination by
/// `dst_pitch`; exactly `dst_pitch` bytes are copied per row, so any padding
/// past the logical row in the source is dropped.
pub fn copy_rows(dst: &mut [u8], src: &[u8], src_pitch: usize, dst_pitch: usize, rows: usize) {
    if dst_pitch == 0 || rows == 0 {
        return;
    }
    debug_assert!(src_pitch >= dst_pitch, "source pitch smaller than row");
    for (dst_row, src_row) in dst
        .chunks_exact_mut(dst_pitch)
        .zip(src.chunks(src_pitch))
        .take(rows)
    {
        dst_row.copy_from_slice(&src_row[..dst_pitch]);
    }
}

/// Maps `staging`, waits for the GPU, and copies its rows into `dst`.
///
/// The buffer is unmapped again before returning on the success path; on
/// failure the owning [`Tracked`](super::textures::Tracked) wrapper destroys it.
pub(crate) fn read_staging(
    device: &wgpu::Device,
    staging: &wgpu::Buffer,
    row_pitch: u32,
    dst: &mut [u8],
    dst_pitch: usize,
    rows: usize,
) -> Result<(), FxError> {
    let slice = staging.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    device
        .poll(wgpu::PollType::Wait)
        .map_err(|err| FxError::Map(format!("waiting for the GPU failed: {err}")))?;

    receiver
        .recv()
        .map_err(|_| FxError::Map("map callback was dropped before completing".into()))?
        .map_err(|err| FxError::Map(err.to_string()))?;

    {
        let mapped = slice.get_mapped_range();
        copy_rows(dst, &mapped, row_pitch as usize, dst_pitch, rows);
    }
    staging.unmap();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_padding_between_rows() {
        // Two rows of 3 logical bytes stored with a pitch of 5.
        let src = [1, 2, 3, 0xEE, 0xEE, 4, 5, 6, 0xEE, 0xEE];
        let mut dst = [0u8; 6];
        copy_rows(&mut dst, &src, 5, 3, 2);
        assert_eq!(dst, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn equal_pitches_copy_verbatim() {
        let src: Vec<u8> = (0..16).collect();
        let mut dst = vec![0u8; 16];
        copy_rows(&mut dst, &src, 8, 8, 2);
        assert_eq!(dst, src);
    }

    #[test]
    fn only_requested_rows_are_written() {
        let src = [9u8; 12];
        let mut dst = [0u8; 6];
        copy_rows(&mut dst, &src, 4, 2, 2);
        assert_eq!(dst, [9, 9, 9, 9, 0, 0]);
    }

    #[test]
    fn zero_width_is_a_no_op() {
        let mut dst: [u8; 0] = [];
        copy_rows(&mut dst, &[1, 2, 3], 3, 0, 1);
    }
}
