//! Conversion of collated [`PairBatch`]es into `tch` tensors.
//!
//! Only compiled with the `tch-backend` feature.

use ndarray::{Array, Dimension};
use tch::{kind::Element, Device, Tensor};

use crate::error::{DataError, DataResult};
use crate::loader::PairBatch;

/// A [`PairBatch`] on a `tch` device.
#[derive(Debug)]
pub struct PairTensors {
    /// `[B, 3, S, S]` float
    pub source_color: Tensor,
    /// `[B, 1, S, S]` float
    pub source_gray: Tensor,
    /// `[B, S, S]` int64
    pub source_mask: Tensor,
    /// `[B, 3, S, S]` float
    pub target_color: Tensor,
    /// `[B, 1, S, S]` float
    pub target_gray: Tensor,
    /// `[B, S, S]` int64
    pub target_mask: Tensor,
    /// `[B, 3, S, S]` float, mirrored targets
    pub target_flip_color: Option<Tensor>,
    /// `[B, 1, S, S]` float, mirrored targets
    pub target_flip_gray: Option<Tensor>,
    /// `[B, S, S]` int64, mirrored targets
    pub target_flip_mask: Option<Tensor>,
    /// `[B]` int64
    pub source_indices: Tensor,
    /// `[B]` int64
    pub target_indices: Tensor,
}

impl PairBatch {
    /// Copy every array of the batch into a tensor on `device`.
    pub fn to_tensors(&self, device: Device) -> DataResult<PairTensors> {
        Ok(PairTensors {
            source_color: array_to_tensor(&self.source_color, device)?,
            source_gray: array_to_tensor(&self.source_gray, device)?,
            source_mask: array_to_tensor(&self.source_mask, device)?,
            target_color: array_to_tensor(&self.target_color, device)?,
            target_gray: array_to_tensor(&self.target_gray, device)?,
            target_mask: array_to_tensor(&self.target_mask, device)?,
            target_flip_color: self.target_flip_color.as_ref().map(|a| array_to_tensor(a, device)).transpose()?,
            target_flip_gray: self.target_flip_gray.as_ref().map(|a| array_to_tensor(a, device)).transpose()?,
            target_flip_mask: self.target_flip_mask.as_ref().map(|a| array_to_tensor(a, device)).transpose()?,
            source_indices: indices_to_tensor(&self.source_indices, device)?,
            target_indices: indices_to_tensor(&self.target_indices, device)?,
        })
    }
}

/// Copy an n-dimensional array into a tensor of the same shape.
pub fn array_to_tensor<T, D>(arr: &Array<T, D>, device: Device) -> DataResult<Tensor>
where
    T: Element + Clone,
    D: Dimension,
{
    let shape: Vec<i64> = arr.shape().iter().map(|&d| d as i64).collect();
    let contiguous = arr.as_standard_layout();
    let data = contiguous
        .as_slice()
        .ok_or_else(|| DataError::shape_mismatch(arr.shape().to_vec(), vec![]))?;
    let tensor = Tensor::f_from_slice(data)?.f_view(shape.as_slice())?;
    Ok(tensor.to_device(device))
}

fn indices_to_tensor(indices: &[usize], device: Device) -> DataResult<Tensor> {
    let data: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
    Ok(Tensor::f_from_slice(&data)?.to_device(device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{PairedExample, Sample};
    use ndarray::{Array2, Array3};
    use tch::Kind;

    #[test]
    fn array_to_tensor_keeps_shape_and_values() {
        let arr = Array3::from_shape_fn((2, 3, 4), |(a, b, c)| (a * 100 + b * 10 + c) as f32);
        let t = array_to_tensor(&arr, Device::Cpu).unwrap();
        assert_eq!(t.size(), vec![2, 3, 4]);
        assert_eq!(t.kind(), Kind::Float);
        assert_eq!(t.double_value(&[1, 2, 3]), 123.0);
    }

    #[test]
    fn transposed_views_are_made_contiguous() {
        let arr = Array3::from_shape_fn((2, 3, 4), |(a, b, c)| (a * 100 + b * 10 + c) as i64);
        let t = array_to_tensor(&arr.permuted_axes([2, 1, 0]), Device::Cpu).unwrap();
        assert_eq!(t.size(), vec![4, 3, 2]);
        assert_eq!(t.int64_value(&[3, 2, 1]), 123);
    }

    #[test]
    fn mirrored_targets_become_tensors() {
        let sample = |index: usize| Sample {
            index,
            color: Array3::from_elem((3, 2, 2), index as f32),
            gray: Array3::from_elem((1, 2, 2), index as f32),
            mask: Array2::from_elem((2, 2), index as i64),
        };
        let target = sample(3);
        let pair = PairedExample { source: sample(1), target_flip: Some(target.mirrored()), target };
        let tensors = PairBatch::collate(&[pair]).unwrap().to_tensors(Device::Cpu).unwrap();
        let mask = tensors.target_flip_mask.expect("mirrored mask");
        assert_eq!(mask.size(), vec![1, 2, 2]);
        assert_eq!(mask.int64_value(&[0, 1, 0]), 3);
        assert!(tensors.target_flip_color.is_some());
    }
}
