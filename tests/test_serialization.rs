// Tests for the binary weight record: round trips through files, state reset
// on load, and behaviour on malformed input.

use mlp_layer::layers::persist::{record_len, HEADER_BYTES};
use mlp_layer::layers::{Layer, MlpLayer};
use mlp_layer::utils::{ActivationKind, Float, SimpleRng, StandardActivation};
use mlp_layer::LayerError;
use std::fs;
use std::io::{Cursor, Write};
use std::sync::Arc;
use tempfile::NamedTempFile;

fn trained_layer(kind: ActivationKind, previous: usize, current: usize) -> MlpLayer {
    let mut rng = SimpleRng::new(99);
    let mut layer = MlpLayer::with_standard(kind);
    layer.allocate(previous, current, &mut rng).unwrap();

    let input: Vec<Float> = (0..previous).map(|i| i as Float * 0.1 - 0.3).collect();
    let target = vec![0.5; current];
    layer.forward(&input);
    layer.backward_output(&input, &target);
    layer
}

fn assert_scratch_zeroed(layer: &MlpLayer) {
    assert!(layer.weight_gradients().iter().all(|&g| g == 0.0));
    assert!(layer.bias_gradients().iter().all(|&g| g == 0.0));
    assert!(layer.delta().iter().all(|&d| d == 0.0));
    assert!(layer.output().iter().all(|&y| y == 0.0));
}

// ============================================================================
// Round trips
// ============================================================================

mod round_trip_tests {
    use super::*;

    #[test]
    fn test_file_round_trip_is_bit_exact() {
        let original = trained_layer(ActivationKind::TANH, 7, 3);
        let file = NamedTempFile::new().unwrap();
        original.save(file.path()).unwrap();

        let mut restored = MlpLayer::with_standard(ActivationKind::SIGMOID);
        restored.load(file.path()).unwrap();

        assert_eq!(restored.previous_count(), 7);
        assert_eq!(restored.current_count(), 3);
        assert_eq!(restored.activation_kind(), ActivationKind::TANH);
        let bits = |v: &[Float]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(restored.weights()), bits(original.weights()));
        assert_eq!(bits(restored.biases()), bits(original.biases()));
        assert_scratch_zeroed(&restored);
    }

    #[test]
    fn test_file_size_matches_layout() {
        let original = trained_layer(ActivationKind::RELU, 5, 4);
        let file = NamedTempFile::new().unwrap();
        original.save(file.path()).unwrap();

        let len = fs::metadata(file.path()).unwrap().len() as usize;
        assert_eq!(len, record_len(5, 4));
        assert_eq!(HEADER_BYTES, 9);
    }

    #[test]
    fn test_load_discards_previous_state() {
        let original = trained_layer(ActivationKind::SIGMOID, 2, 2);
        let mut bytes = Vec::new();
        original.write_to(&mut bytes).unwrap();

        // Target layer has a different shape and live gradients
        let mut target = trained_layer(ActivationKind::LEAKY_RELU, 6, 5);
        assert!(target.weight_gradients().iter().any(|&g| g != 0.0));

        target.read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(target.input_size(), 2);
        assert_eq!(target.output_size(), 2);
        assert_eq!(target.activation_kind(), ActivationKind::SIGMOID);
        assert_eq!(target.weights(), original.weights());
        assert_scratch_zeroed(&target);
    }

    #[test]
    fn test_from_reader_then_forward_matches() {
        let mut original = trained_layer(ActivationKind::SIGMOID, 4, 2);
        let mut bytes = Vec::new();
        original.write_to(&mut bytes).unwrap();

        let mut restored =
            MlpLayer::from_reader(Arc::new(StandardActivation), &mut Cursor::new(bytes)).unwrap();

        let input = [0.25, -0.5, 1.0, 0.0];
        let expected = original.forward(&input).to_vec();
        assert_eq!(restored.forward(&input), &expected[..]);
    }

    #[test]
    fn test_consecutive_records_in_one_stream() {
        let first = trained_layer(ActivationKind::SIGMOID, 3, 4);
        let second = trained_layer(ActivationKind::LINEAR, 4, 1);
        let mut bytes = Vec::new();
        first.write_to(&mut bytes).unwrap();
        second.write_to(&mut bytes).unwrap();

        let mut cursor = Cursor::new(bytes);
        let mut a = MlpLayer::with_standard(ActivationKind::SIGMOID);
        let mut b = MlpLayer::with_standard(ActivationKind::SIGMOID);
        a.read_from(&mut cursor).unwrap();
        b.read_from(&mut cursor).unwrap();

        assert_eq!(a.weights(), first.weights());
        assert_eq!(b.weights(), second.weights());
        assert_eq!(b.activation_kind(), ActivationKind::LINEAR);
    }
}

// ============================================================================
// Malformed records
// ============================================================================

mod malformed_tests {
    use super::*;

    #[test]
    fn test_truncated_file() {
        let original = trained_layer(ActivationKind::SIGMOID, 3, 2);
        let mut bytes = Vec::new();
        original.write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 1);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let mut layer = MlpLayer::with_standard(ActivationKind::SIGMOID);
        let err = layer.load(file.path()).unwrap_err();
        assert!(matches!(err, LayerError::Io(_)));

        // Allocated and filled up to the short read
        assert!(layer.is_allocated());
        assert_eq!(layer.weights(), original.weights());
        assert_eq!(layer.biases()[0], original.biases()[0]);
    }

    #[test]
    fn test_truncated_header() {
        let mut layer = MlpLayer::with_standard(ActivationKind::SIGMOID);
        let err = layer.read_from(&mut Cursor::new(vec![1u8, 0, 0])).unwrap_err();
        assert!(matches!(err, LayerError::Io(_)));
        assert!(!layer.is_allocated());
    }

    #[test]
    fn test_negative_dimension() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(-3i32).to_ne_bytes());
        bytes.extend_from_slice(&2i32.to_ne_bytes());
        bytes.push(0);

        let mut layer = MlpLayer::with_standard(ActivationKind::SIGMOID);
        let err = layer.read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, LayerError::InvalidDimensions { previous: -3, current: 2 }));
    }

    #[test]
    fn test_missing_file() {
        let mut layer = MlpLayer::with_standard(ActivationKind::SIGMOID);
        assert!(matches!(
            layer.load("definitely/not/here.bin"),
            Err(LayerError::Io(_))
        ));
    }
}
