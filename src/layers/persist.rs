//! Binary weight record for [`MlpLayer`].
//!
//! Layout, native-endian, no version field or checksum:
//!
//! ```text
//! i32   previous count (P)
//! i32   current count (C)
//! u8    activation tag
//! Float W[P * C]   row-major by output neuron
//! Float b[C]
//! ```
//!
//! The float width follows [`Float`], so a record must be read back by a
//! build with the same storage precision that wrote it.

use crate::error::{LayerError, Result};
use crate::layers::mlp::{LayerBuffers, MlpLayer};
use crate::utils::activations::{Activation, ActivationKind};
use crate::utils::precision::{Float, FLOAT_BYTES};
use log::debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// Bytes taken by the fixed header.
pub const HEADER_BYTES: usize = 4 + 4 + 1;

/// Total record size for a `previous → current` layer.
pub fn record_len(previous: usize, current: usize) -> usize {
    HEADER_BYTES + (previous * current + current) * FLOAT_BYTES
}

fn header_dim(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| LayerError::DimensionOverflow(value))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_ne_bytes(bytes))
}

/// Fill `dst` in order; on a short read the slots already read keep their
/// new values.
fn read_floats<R: Read>(reader: &mut R, dst: &mut [Float]) -> Result<()> {
    let mut bytes = [0u8; FLOAT_BYTES];
    for slot in dst.iter_mut() {
        reader.read_exact(&mut bytes)?;
        *slot = Float::from_ne_bytes(bytes);
    }
    Ok(())
}

fn write_floats<W: Write>(writer: &mut W, src: &[Float]) -> Result<()> {
    for value in src {
        writer.write_all(&value.to_ne_bytes())?;
    }
    Ok(())
}

impl MlpLayer {
    /// Write the layer's record.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let buffers = self.buffers.as_ref().ok_or(LayerError::NotAllocated)?;
        let previous = header_dim(buffers.previous)?;
        let current = header_dim(buffers.current)?;

        writer.write_all(&previous.to_ne_bytes())?;
        writer.write_all(&current.to_ne_bytes())?;
        writer.write_all(&[self.activation_kind().tag()])?;
        write_floats(writer, &buffers.weights)?;
        write_floats(writer, &buffers.biases)?;
        Ok(())
    }

    /// Read a record into this layer.
    ///
    /// The header is decoded first, then the layer is reallocated with the
    /// decoded dimensions (gradients, outputs and deltas zeroed, any previous
    /// state dropped) and `W` then `b` are filled from the body.
    ///
    /// Header problems (non-positive dimensions, a tag this layer's
    /// activation does not support) leave the layer untouched. A body that
    /// ends early returns an I/O error and leaves the layer allocated and
    /// partially filled.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        let previous = read_i32(reader)?;
        let current = read_i32(reader)?;
        let mut tag = [0u8; 1];
        reader.read_exact(&mut tag)?;
        let kind = ActivationKind(tag[0]);

        if previous <= 0 || current <= 0 {
            return Err(LayerError::InvalidDimensions {
                previous: i64::from(previous),
                current: i64::from(current),
            });
        }
        if !self.activation().supports(kind) {
            return Err(LayerError::UnsupportedActivation(kind.tag()));
        }

        let fresh = LayerBuffers::zeroed(previous as usize, current as usize)?;
        self.set_activation_kind(kind);
        let buffers = self.buffers.insert(fresh);
        read_floats(reader, &mut buffers.weights)?;
        read_floats(reader, &mut buffers.biases)?;

        debug!("read {}x{} layer ({})", previous, current, kind);
        Ok(())
    }

    /// Build a layer from a record using `activation` as its capability.
    pub fn from_reader<R: Read>(activation: Arc<dyn Activation>, reader: &mut R) -> Result<Self> {
        let mut layer = MlpLayer::new(activation, ActivationKind::default());
        layer.read_from(reader)?;
        Ok(layer)
    }

    /// Write the record to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        debug!("saved layer to {}", path.display());
        Ok(())
    }

    /// Read the record from a file.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        self.read_from(&mut reader)?;
        debug!("loaded layer from {}", path.display());
        Ok(())
    }
}
