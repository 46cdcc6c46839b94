//! Template storage
//!
//! Both template sets share one compiled layout: per class, a list of
//! prototypes (straight stroke segments) and a list of configurations
//! (proto masks). The geometry matcher only ever sees this layout.
//!
//! - [`PreTrainedTemplates`]: immutable, loaded once, shared across sessions
//! - [`AdaptedTemplateStore`]: per-session learned templates with the
//!   temporary / permanent config lifecycle

mod adaptive;
mod pretrained;

pub use adaptive::{
    AdaptedConfig, AdaptedTemplateStore, AdaptiveClass, PermConfig, TempConfig, TempProto,
};
pub use pretrained::PreTrainedTemplates;

use glyphlearn_core::{ClassId, ConfigMask, MAX_NUM_CONFIGS, MAX_NUM_PROTOS, ProtoId, ProtoMask};
use serde::{Deserialize, Serialize};

/// A straight stroke segment in normalized blob space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Proto {
    pub x: f32,
    pub y: f32,
    /// Direction in turns, `[0, 1)`
    pub angle: f32,
    pub length: f32,
}

impl Proto {
    pub fn new(x: f32, y: f32, angle: f32, length: f32) -> Self {
        Self {
            x,
            y,
            angle: angle.rem_euclid(1.0),
            length,
        }
    }
}

/// Compiled protos and configs of one class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledClass {
    protos: Vec<Proto>,
    configs: Vec<ProtoMask>,
    /// Protos visible to the class pruner
    pruner_protos: ProtoMask,
}

impl CompiledClass {
    pub fn new() -> Self {
        Self {
            protos: Vec::new(),
            configs: Vec::new(),
            pruner_protos: ProtoMask::new(MAX_NUM_PROTOS),
        }
    }

    #[inline]
    pub fn num_protos(&self) -> usize {
        self.protos.len()
    }

    #[inline]
    pub fn num_configs(&self) -> usize {
        self.configs.len()
    }

    pub fn protos(&self) -> &[Proto] {
        &self.protos
    }

    pub fn proto(&self, id: ProtoId) -> Option<&Proto> {
        self.protos.get(id)
    }

    /// Proto mask of a config
    pub fn config(&self, id: usize) -> Option<&ProtoMask> {
        self.configs.get(id)
    }

    pub fn configs(&self) -> &[ProtoMask] {
        &self.configs
    }

    pub fn pruner_protos(&self) -> &ProtoMask {
        &self.pruner_protos
    }

    /// Number of protos that can still be added
    pub fn proto_capacity_left(&self) -> usize {
        MAX_NUM_PROTOS - self.protos.len()
    }

    /// Appends a proto, returning its id, or `None` when the class is full
    pub(crate) fn add_proto(&mut self, proto: Proto) -> Option<ProtoId> {
        if self.protos.len() >= MAX_NUM_PROTOS {
            return None;
        }
        self.protos.push(proto);
        Some(self.protos.len() - 1)
    }

    /// Appends a config, returning its id, or `None` when the class is full
    pub(crate) fn add_config(&mut self, protos: ProtoMask) -> Option<usize> {
        if self.configs.len() >= MAX_NUM_CONFIGS {
            return None;
        }
        self.configs.push(protos);
        Some(self.configs.len() - 1)
    }

    pub(crate) fn add_pruner_proto(&mut self, id: ProtoId) {
        self.pruner_protos.set(id);
    }

    /// Describes the first capacity or mask inconsistency, if any
    pub(crate) fn inconsistency(&self) -> Option<String> {
        if self.protos.len() > MAX_NUM_PROTOS {
            return Some(format!("{} protos exceed the limit", self.protos.len()));
        }
        if self.configs.len() > MAX_NUM_CONFIGS {
            return Some(format!("{} configs exceed the limit", self.configs.len()));
        }
        if !self.pruner_protos.is_well_formed() || !self.configs.iter().all(ProtoMask::is_well_formed)
        {
            return Some("malformed proto mask".to_string());
        }
        None
    }
}

/// Compiled classes indexed by [`ClassId`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledTemplates {
    classes: Vec<CompiledClass>,
}

impl CompiledTemplates {
    /// Creates `num_classes` empty classes
    pub fn new(num_classes: usize) -> Self {
        Self {
            classes: (0..num_classes).map(|_| CompiledClass::new()).collect(),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn class(&self, class_id: ClassId) -> Option<&CompiledClass> {
        self.classes.get(class_id.index())
    }

    pub(crate) fn class_mut(&mut self, class_id: ClassId) -> Option<&mut CompiledClass> {
        self.classes.get_mut(class_id.index())
    }

    /// Iterates over `(class id, class)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &CompiledClass)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (ClassId(i as u16), c))
    }
}

/// Mask with every proto enabled
pub fn all_protos_on() -> ProtoMask {
    ProtoMask::all_on(MAX_NUM_PROTOS)
}

/// Mask with every config enabled
pub fn all_configs_on() -> ConfigMask {
    ConfigMask::all_on(MAX_NUM_CONFIGS)
}

/// Mask with every config disabled
pub fn all_configs_off() -> ConfigMask {
    ConfigMask::new(MAX_NUM_CONFIGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiled_class_capacity() {
        let mut class = CompiledClass::new();
        for i in 0..MAX_NUM_PROTOS {
            assert_eq!(class.add_proto(Proto::default()), Some(i));
        }
        assert_eq!(class.add_proto(Proto::default()), None);
        assert_eq!(class.proto_capacity_left(), 0);

        for i in 0..MAX_NUM_CONFIGS {
            assert_eq!(class.add_config(ProtoMask::new(MAX_NUM_PROTOS)), Some(i));
        }
        assert_eq!(class.add_config(ProtoMask::new(MAX_NUM_PROTOS)), None);
    }

    #[test]
    fn test_proto_angle_wraps() {
        let p = Proto::new(0.0, 0.0, -0.25, 0.1);
        assert!((p.angle - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_templates_iter() {
        let t = CompiledTemplates::new(3);
        let ids: Vec<ClassId> = t.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![ClassId(0), ClassId(1), ClassId(2)]);
        assert!(t.class(ClassId(3)).is_none());
    }
}
