/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

use crate::{Error, Result};
use std::collections::VecDeque;

/// A memory region the bus may read from or write into in place.
///
/// Direct transfers hand the region straight to the kernel, so it has to be
/// one contiguous run of bytes. Implementations return `None` when their
/// storage is currently split.
pub trait BusBuffer {
    fn as_contiguous(&self) -> Option<&[u8]>;

    fn as_contiguous_mut(&mut self) -> Option<&mut [u8]>;

    /// The first `length` bytes of the region.
    fn region(&self, length: usize) -> Result<&[u8]> {
        self.as_contiguous()
            .ok_or(Error::InvalidArgument("buffer is not contiguous"))?
            .get(..length)
            .ok_or(Error::InvalidArgument("buffer is shorter than the requested length"))
    }

    fn region_mut(&mut self, length: usize) -> Result<&mut [u8]> {
        self.as_contiguous_mut()
            .ok_or(Error::InvalidArgument("buffer is not contiguous"))?
            .get_mut(..length)
            .ok_or(Error::InvalidArgument("buffer is shorter than the requested length"))
    }
}

impl BusBuffer for [u8] {
    fn as_contiguous(&self) -> Option<&[u8]> {
        Some(self)
    }

    fn as_contiguous_mut(&mut self) -> Option<&mut [u8]> {
        Some(self)
    }
}

impl<const N: usize> BusBuffer for [u8; N] {
    fn as_contiguous(&self) -> Option<&[u8]> {
        Some(self)
    }

    fn as_contiguous_mut(&mut self) -> Option<&mut [u8]> {
        Some(self)
    }
}

impl BusBuffer for Vec<u8> {
    fn as_contiguous(&self) -> Option<&[u8]> {
        Some(self)
    }

    fn as_contiguous_mut(&mut self) -> Option<&mut [u8]> {
        Some(self)
    }
}

// Ring buffers are contiguous only until they wrap.
impl BusBuffer for VecDeque<u8> {
    fn as_contiguous(&self) -> Option<&[u8]> {
        match self.as_slices() {
            (front, []) => Some(front),
            ([], back) => Some(back),
            _ => None,
        }
    }

    fn as_contiguous_mut(&mut self) -> Option<&mut [u8]> {
        match self.as_mut_slices() {
            (front, []) => Some(front),
            ([], back) => Some(back),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapped() -> VecDeque<u8> {
        let mut deque = VecDeque::from(vec![1, 2, 3]);
        deque.push_front(0);
        deque
    }

    #[test]
    fn slices_are_contiguous() {
        let data = [1u8, 2, 3, 4];
        assert_eq!(data.region(2).unwrap(), &[1, 2]);
        assert_eq!(data[..].region(4).unwrap(), &data);
        assert_eq!(vec![9u8; 3].region(0).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn short_region_is_rejected() {
        let mut data = vec![0u8; 2];
        assert!(matches!(data.region(3), Err(Error::InvalidArgument(_))));
        assert!(matches!(data.region_mut(3), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn wrapped_ring_is_not_contiguous() {
        let mut deque = wrapped();
        assert!(deque.as_contiguous().is_none());
        assert!(matches!(deque.region_mut(1), Err(Error::InvalidArgument(_))));

        deque.make_contiguous();
        assert_eq!(deque.region(4).unwrap(), &[0, 1, 2, 3]);
    }
}
