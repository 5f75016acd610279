//! Output symbol buffer
//!
//! Fixed-capacity accumulator between the decimator and the consumer
//! callback. Symbols are appended at a cursor; when the cursor reaches the
//! capacity the whole buffer is handed out as one window and the cursor
//! returns to 0. Resizing below the current fill level flushes full-sized
//! windows first, so no symbol is dropped and every window the consumer sees
//! is exactly the configured length.

use num_complex::Complex;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct OutputBuffer {
    /// Storage, always `capacity` long; only `[0, count)` is meaningful
    samples: Vec<Complex<f32>>,
    /// Fill cursor
    count: usize,
}

impl OutputBuffer {
    /// Allocate a buffer holding `capacity` symbols.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::config("buffer length must be greater than 0"));
        }
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(capacity)
            .map_err(|e| Error::allocation(capacity, e))?;
        samples.resize(capacity, Complex::new(0.0, 0.0));
        Ok(Self { samples, count: 0 })
    }

    /// Window length delivered to the consumer.
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Number of buffered, not yet delivered symbols.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Buffered, not yet delivered symbols.
    pub fn as_slice(&self) -> &[Complex<f32>] {
        &self.samples[..self.count]
    }

    /// Forget all buffered symbols. Storage is kept.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Append one symbol.
    ///
    /// Returns the full buffer when this symbol filled it; the cursor is
    /// already back at 0 when the window is returned.
    pub fn push(&mut self, x: Complex<f32>) -> Option<&[Complex<f32>]> {
        self.samples[self.count] = x;
        self.count += 1;

        if self.count == self.samples.len() {
            self.count = 0;
            Some(self.samples.as_slice())
        } else {
            None
        }
    }

    /// Change the capacity to `new_len`.
    ///
    /// When fewer than `new_len` symbols are buffered they stay in place.
    /// Otherwise `flush` receives consecutive `new_len`-sized windows until
    /// fewer than `new_len` remain, and the residual moves to the front.
    ///
    /// A zero length is rejected before anything changes. If growing the
    /// storage fails the buffer keeps its previous capacity and contents.
    pub fn resize<F>(&mut self, new_len: usize, mut flush: F) -> Result<()>
    where
        F: FnMut(&[Complex<f32>]),
    {
        if new_len == 0 {
            return Err(Error::config("buffer length must be greater than 0"));
        }

        if self.count < new_len {
            if new_len > self.samples.len() {
                let additional = new_len - self.samples.len();
                self.samples
                    .try_reserve_exact(additional)
                    .map_err(|e| Error::allocation(new_len, e))?;
            }
            self.samples.resize(new_len, Complex::new(0.0, 0.0));
        } else {
            let mut index = 0;
            while self.count >= new_len {
                flush(&self.samples[index..index + new_len]);
                index += new_len;
                self.count -= new_len;
            }

            self.samples.copy_within(index..index + self.count, 0);
            self.samples.truncate(new_len);
            self.samples.shrink_to_fit();
        }
        Ok(())
    }
}
