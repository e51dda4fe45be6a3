//! Center-crop alignment of skip connections

use burn::tensor::{backend::Backend, Tensor};

use crate::utils::error::{Result, UNetError};

/// Leading-edge offset of a centered crop from `source` down to `target`
///
/// Floors on an odd difference, so the extra row or column stays on the
/// trailing edge.
pub fn crop_offset(source: usize, target: usize) -> usize {
    source.saturating_sub(target) / 2
}

/// Crop the spatial axes of `source` to `[height, width]`, keeping the center
pub fn center_crop<B: Backend>(source: Tensor<B, 4>, target: [usize; 2]) -> Result<Tensor<B, 4>> {
    let [batch, channels, height, width] = source.dims();
    let [target_h, target_w] = target;

    if target_h > height || target_w > width {
        return Err(UNetError::CropOutOfBounds {
            source_size: [height, width],
            target,
        });
    }

    if target_h == height && target_w == width {
        return Ok(source);
    }

    let top = crop_offset(height, target_h);
    let left = crop_offset(width, target_w);

    Ok(source.slice([
        0..batch,
        0..channels,
        top..top + target_h,
        left..left + target_w,
    ]))
}

/// Crop `source` to the spatial size of `like`
pub fn center_crop_like<B: Backend>(source: Tensor<B, 4>, like: &Tensor<B, 4>) -> Result<Tensor<B, 4>> {
    let [_, _, height, width] = like.dims();
    center_crop(source, [height, width])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Int;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    /// Single-channel `size x size` map whose value is its row-major index
    fn indexed(size: usize) -> Tensor<TestBackend, 4> {
        let device = Default::default();
        Tensor::<TestBackend, 1, Int>::arange(0..(size * size) as i64, &device)
            .float()
            .reshape([1, 1, size, size])
    }

    fn values(tensor: Tensor<TestBackend, 4>) -> Vec<f32> {
        tensor.into_data().to_vec().unwrap()
    }

    #[test]
    fn test_crop_offset() {
        assert_eq!(crop_offset(64, 56), 4);
        assert_eq!(crop_offset(568, 392), 88);
        assert_eq!(crop_offset(7, 4), 1);
        assert_eq!(crop_offset(4, 4), 0);
    }

    #[test]
    fn test_even_difference_is_symmetric() {
        let cropped = center_crop(indexed(6), [4, 4]).unwrap();
        assert_eq!(cropped.dims(), [1, 1, 4, 4]);

        let v = values(cropped);
        // rows 1..5, columns 1..5 of a 6x6 grid
        assert_eq!(v[0], 7.0);
        assert_eq!(v[3], 10.0);
        assert_eq!(v[15], 28.0);
    }

    #[test]
    fn test_odd_difference_keeps_trailing_edge() {
        let cropped = center_crop(indexed(7), [4, 4]).unwrap();
        assert_eq!(cropped.dims(), [1, 1, 4, 4]);

        let v = values(cropped);
        // offset 1: rows 1..5, columns 1..5 of a 7x7 grid; row 6 and column 6 dropped
        assert_eq!(v[0], 8.0);
        assert_eq!(v[15], 32.0);
    }

    #[test]
    fn test_crop_is_idempotent() {
        let first = center_crop(indexed(9), [5, 5]).unwrap();
        let second = center_crop(indexed(9), [5, 5]).unwrap();
        assert_eq!(values(first.clone()), values(second));

        // Cropping in two steps lands on the same window as cropping once
        let stepped = center_crop(center_crop(indexed(9), [7, 7]).unwrap(), [5, 5]).unwrap();
        assert_eq!(values(first.clone()), values(stepped));

        let again = center_crop(first.clone(), [5, 5]).unwrap();
        assert_eq!(values(first), values(again));
    }

    #[test]
    fn test_crop_is_idempotent_with_odd_difference() {
        let first = center_crop(indexed(8), [5, 5]).unwrap();
        let second = center_crop(indexed(8), [5, 5]).unwrap();

        let v = values(first.clone());
        assert_eq!(v, values(second));
        // Offset 1: rows and columns 1..6 of the 8x8 source
        assert_eq!(v[0], 9.0);
        assert_eq!(v[24], 45.0);

        let again = center_crop(first, [5, 5]).unwrap();
        assert_eq!(values(again), v);
    }

    #[test]
    fn test_non_square_crop() {
        let device = Default::default();
        let source = Tensor::<TestBackend, 4>::ones([2, 3, 10, 12], &device);
        let cropped = center_crop(source, [6, 4]).unwrap();
        assert_eq!(cropped.dims(), [2, 3, 6, 4]);
    }

    #[test]
    fn test_crop_like() {
        let device = Default::default();
        let source = Tensor::<TestBackend, 4>::zeros([1, 8, 64, 64], &device);
        let target = Tensor::<TestBackend, 4>::zeros([1, 8, 56, 56], &device);
        assert_eq!(center_crop_like(source, &target).unwrap().dims(), [1, 8, 56, 56]);
    }

    #[test]
    fn test_crop_larger_than_source_fails() {
        let err = center_crop(indexed(4), [5, 5]).unwrap_err();
        assert!(matches!(err, UNetError::CropOutOfBounds { .. }));
    }
}
