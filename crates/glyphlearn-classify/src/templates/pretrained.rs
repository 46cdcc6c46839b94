//! Built-in templates

use glyphlearn_core::{ClassId, ConfigId, MAX_NUM_CONFIGS, MAX_NUM_PROTOS, ProtoMask};
use serde::{Deserialize, Serialize};

use super::{CompiledClass, CompiledTemplates, Proto};
use crate::{ClassifyError, ClassifyResult};

/// Read-only templates trained offline
///
/// Each config records either a font id or, when a shape table is in use,
/// the shape id it represents. Cutoffs hold the expected feature count
/// per class for the class pruner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreTrainedTemplates {
    templates: CompiledTemplates,
    font_sets: Vec<Vec<u32>>,
    char_norm_cutoffs: Vec<u16>,
}

impl PreTrainedTemplates {
    /// Creates an empty set sized for `num_classes` classes
    pub fn new(num_classes: usize) -> Self {
        Self {
            templates: CompiledTemplates::new(num_classes),
            font_sets: vec![Vec::new(); num_classes],
            char_norm_cutoffs: vec![0; num_classes],
        }
    }

    pub fn num_classes(&self) -> usize {
        self.templates.num_classes()
    }

    pub fn templates(&self) -> &CompiledTemplates {
        &self.templates
    }

    pub fn class(&self, class_id: ClassId) -> Option<&CompiledClass> {
        self.templates.class(class_id)
    }

    /// Returns true if the class has at least one trained config
    pub fn has_class(&self, class_id: ClassId) -> bool {
        self.class(class_id).is_some_and(|c| c.num_configs() > 0)
    }

    /// Adds a trained config made of `protos`
    ///
    /// `font_or_shape` is the font id of the sample, or its shape id when
    /// the templates are used with a shape table.
    pub fn add_config(
        &mut self,
        class_id: ClassId,
        protos: &[Proto],
        font_or_shape: u32,
    ) -> ClassifyResult<ConfigId> {
        let num_classes = self.num_classes();
        let class = self
            .templates
            .class_mut(class_id)
            .ok_or(ClassifyError::InvalidClassId {
                class_id,
                num_classes,
            })?;
        if class.num_configs() >= MAX_NUM_CONFIGS {
            return Err(ClassifyError::CapacityExhausted {
                class_id,
                what: "configs",
            });
        }
        if protos.len() > class.proto_capacity_left() {
            return Err(ClassifyError::CapacityExhausted {
                class_id,
                what: "protos",
            });
        }
        let mut mask = ProtoMask::new(MAX_NUM_PROTOS);
        for proto in protos {
            if let Some(pid) = class.add_proto(*proto) {
                class.add_pruner_proto(pid);
                mask.set(pid);
            }
        }
        let config = class.add_config(mask).ok_or(ClassifyError::CapacityExhausted {
            class_id,
            what: "configs",
        })?;
        self.font_sets[class_id.index()].push(font_or_shape);
        Ok(config)
    }

    /// Font or shape id recorded for a config
    pub fn font_or_shape(&self, class_id: ClassId, config: ConfigId) -> Option<u32> {
        self.font_sets.get(class_id.index())?.get(config).copied()
    }

    /// Sets the expected feature count of a class
    pub fn set_cutoff(&mut self, class_id: ClassId, expected_features: u16) -> ClassifyResult<()> {
        let num_classes = self.num_classes();
        let slot = self
            .char_norm_cutoffs
            .get_mut(class_id.index())
            .ok_or(ClassifyError::InvalidClassId {
                class_id,
                num_classes,
            })?;
        *slot = expected_features;
        Ok(())
    }

    /// Expected feature count of a class, 0 when unknown
    pub fn cutoff(&self, class_id: ClassId) -> u16 {
        self.char_norm_cutoffs
            .get(class_id.index())
            .copied()
            .unwrap_or(0)
    }

    pub fn cutoffs(&self) -> &[u16] {
        &self.char_norm_cutoffs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_config() {
        let mut t = PreTrainedTemplates::new(3);
        let protos = [
            Proto::new(0.0, 0.1, 0.25, 0.2),
            Proto::new(0.1, 0.1, 0.0, 0.2),
        ];
        let c0 = t.add_config(ClassId(1), &protos, 7).unwrap();
        let c1 = t.add_config(ClassId(1), &protos[..1], 8).unwrap();
        assert_eq!((c0, c1), (0, 1));
        let class = t.class(ClassId(1)).unwrap();
        assert_eq!(class.num_protos(), 3);
        assert_eq!(class.config(1).unwrap().iter_ones().collect::<Vec<_>>(), vec![2]);
        assert_eq!(class.pruner_protos().count_ones(), 3);
        assert_eq!(t.font_or_shape(ClassId(1), 1), Some(8));
        assert!(t.has_class(ClassId(1)));
        assert!(!t.has_class(ClassId(2)));
    }

    #[test]
    fn test_invalid_class() {
        let mut t = PreTrainedTemplates::new(2);
        assert!(matches!(
            t.add_config(ClassId(5), &[], 0),
            Err(ClassifyError::InvalidClassId { .. })
        ));
        assert!(t.set_cutoff(ClassId(5), 3).is_err());
        t.set_cutoff(ClassId(1), 12).unwrap();
        assert_eq!(t.cutoff(ClassId(1)), 12);
        assert_eq!(t.cutoff(ClassId(9)), 0);
    }
}
