//! Compute-device placement
//!
//! The trainer is agnostic to how tensors actually move; [`ToDevice`] is a
//! structural move that preserves container shape so mixed batches
//! (tensors plus metadata) transfer cleanly. Host-only payloads implement
//! it as the identity.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use ndarray::{Array, Dimension};
use serde::{Deserialize, Serialize};

use crate::nested::Nested;

/// Placement descriptor for model, optimizer, and batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
}

impl Device {
    /// Accelerator devices require a host round-trip for checkpointing
    #[must_use]
    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Cuda(_))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(index) => write!(f, "cuda:{index}"),
        }
    }
}

/// Structural move of a value to a device, preserving nested shape
pub trait ToDevice {
    #[must_use]
    fn to_device(self, device: Device) -> Self;
}

macro_rules! identity_to_device {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToDevice for $ty {
                fn to_device(self, _device: Device) -> Self {
                    self
                }
            }
        )*
    };
}

// Plain scalars and metadata stay where they are.
identity_to_device!(bool, i32, i64, u32, u64, usize, f32, f64, String, ());

// Host arrays: the actual accelerator transfer belongs to the tensor
// runtime behind the Model trait.
impl<A, D: Dimension> ToDevice for Array<A, D> {
    fn to_device(self, _device: Device) -> Self {
        self
    }
}

impl<T: ToDevice> ToDevice for Option<T> {
    fn to_device(self, device: Device) -> Self {
        self.map(|value| value.to_device(device))
    }
}

impl<T: ToDevice> ToDevice for Vec<T> {
    fn to_device(self, device: Device) -> Self {
        self.into_iter().map(|value| value.to_device(device)).collect()
    }
}

impl<V: ToDevice> ToDevice for BTreeMap<String, V> {
    fn to_device(self, device: Device) -> Self {
        self.into_iter()
            .map(|(key, value)| (key, value.to_device(device)))
            .collect()
    }
}

impl<K: Eq + Hash, V: ToDevice> ToDevice for HashMap<K, V> {
    fn to_device(self, device: Device) -> Self {
        self.into_iter()
            .map(|(key, value)| (key, value.to_device(device)))
            .collect()
    }
}

impl<A: ToDevice, B: ToDevice> ToDevice for (A, B) {
    fn to_device(self, device: Device) -> Self {
        (self.0.to_device(device), self.1.to_device(device))
    }
}

impl<A: ToDevice, B: ToDevice, C: ToDevice> ToDevice for (A, B, C) {
    fn to_device(self, device: Device) -> Self {
        (
            self.0.to_device(device),
            self.1.to_device(device),
            self.2.to_device(device),
        )
    }
}

impl<T: ToDevice> ToDevice for Nested<T> {
    fn to_device(self, device: Device) -> Self {
        self.map(|leaf| leaf.to_device(device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn cpu_is_not_accelerator() {
        assert!(!Device::Cpu.is_accelerator());
        assert!(Device::Cuda(0).is_accelerator());
    }

    #[test]
    fn display_names() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Cuda(1).to_string(), "cuda:1");
    }

    #[test]
    fn default_is_cpu() {
        assert_eq!(Device::default(), Device::Cpu);
    }

    #[test]
    fn structural_move_preserves_shape() {
        let mut batch = BTreeMap::new();
        batch.insert("observation".to_string(), vec![1.0f32, 2.0]);
        batch.insert("target".to_string(), vec![3.0f32]);
        let moved = batch.clone().to_device(Device::Cuda(0));
        assert_eq!(moved, batch);
    }

    #[test]
    fn tuple_batches_move() {
        let batch = (Array1::<f32>::zeros(4), 42u32);
        let moved = batch.clone().to_device(Device::Cpu);
        assert_eq!(moved.0, batch.0);
        assert_eq!(moved.1, 42);
    }

    #[test]
    fn device_serde_round_trip() {
        let json = serde_json::to_string(&Device::Cuda(2)).unwrap();
        let back: Device = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Device::Cuda(2));
    }
}
