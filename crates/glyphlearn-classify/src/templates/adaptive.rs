//! Adapted (learned) templates
//!
//! Every class starts empty. The first confirmed sample bootstraps it with
//! one temporary config built straight from the sample's outline; later
//! samples either reinforce a temporary config or add a new one. A
//! temporary config that has been seen often enough is promoted to a
//! permanent config, which also makes the protos it uses permanent and
//! visible to the class pruner. Promotion never reverts.

use glyphlearn_core::{
    ClassId, ConfigId, ConfigMask, Feature, FontId, MAX_NUM_CONFIGS, MAX_NUM_PROTOS, ProtoId,
    ProtoMask,
};
use serde::{Deserialize, Serialize};

use super::{CompiledClass, CompiledTemplates, Proto};
use crate::{ClassifyError, ClassifyResult};

/// A proto that is not yet owned by a permanent config
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempProto {
    pub proto_id: ProtoId,
    pub proto: Proto,
}

/// Provisional config still accumulating evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempConfig {
    pub times_seen: u32,
    /// Highest proto id in the class when the config was created
    pub max_proto_id: ProtoId,
    pub protos: ProtoMask,
    pub font_id: FontId,
}

/// Trusted config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermConfig {
    /// Classes the promoting sample could also have been read as
    pub ambigs: Vec<ClassId>,
    pub font_id: FontId,
}

/// A learned config: temporary or permanent, never both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdaptedConfig {
    Temporary(TempConfig),
    Permanent(PermConfig),
}

impl AdaptedConfig {
    pub fn is_permanent(&self) -> bool {
        matches!(self, AdaptedConfig::Permanent(_))
    }

    pub fn font_id(&self) -> FontId {
        match self {
            AdaptedConfig::Temporary(t) => t.font_id,
            AdaptedConfig::Permanent(p) => p.font_id,
        }
    }
}

/// Learned state of one class
///
/// Config ids match the config ids of the class's compiled template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveClass {
    configs: Vec<AdaptedConfig>,
    perm_protos: ProtoMask,
    perm_configs: ConfigMask,
    temp_protos: Vec<TempProto>,
    num_perm_configs: usize,
    max_times_seen: u32,
}

impl Default for AdaptiveClass {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveClass {
    pub fn new() -> Self {
        Self {
            configs: Vec::new(),
            perm_protos: ProtoMask::new(MAX_NUM_PROTOS),
            perm_configs: ConfigMask::new(MAX_NUM_CONFIGS),
            temp_protos: Vec::new(),
            num_perm_configs: 0,
            max_times_seen: 0,
        }
    }

    /// Returns true until the class has been bootstrapped
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn configs(&self) -> &[AdaptedConfig] {
        &self.configs
    }

    pub fn config(&self, id: ConfigId) -> Option<&AdaptedConfig> {
        self.configs.get(id)
    }

    pub fn temp_config(&self, id: ConfigId) -> Option<&TempConfig> {
        match self.configs.get(id) {
            Some(AdaptedConfig::Temporary(t)) => Some(t),
            _ => None,
        }
    }

    pub fn is_permanent(&self, id: ConfigId) -> bool {
        self.configs.get(id).is_some_and(AdaptedConfig::is_permanent)
    }

    pub fn font_id(&self, id: ConfigId) -> Option<FontId> {
        self.configs.get(id).map(AdaptedConfig::font_id)
    }

    pub fn num_perm_configs(&self) -> usize {
        self.num_perm_configs
    }

    pub fn max_times_seen(&self) -> u32 {
        self.max_times_seen
    }

    pub fn perm_protos(&self) -> &ProtoMask {
        &self.perm_protos
    }

    pub fn perm_configs(&self) -> &ConfigMask {
        &self.perm_configs
    }

    pub fn temp_protos(&self) -> &[TempProto] {
        &self.temp_protos
    }

    /// Ids of the configs that are still temporary
    pub fn temporary_config_ids(&self) -> Vec<ConfigId> {
        self.configs
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_permanent())
            .map(|(i, _)| i)
            .collect()
    }

    /// Mask of the configs learned from `font_id`
    pub fn configs_with_font(&self, font_id: FontId) -> ConfigMask {
        let mut mask = ConfigMask::new(MAX_NUM_CONFIGS);
        for (i, c) in self.configs.iter().enumerate() {
            if c.font_id() == font_id {
                mask.set(i);
            }
        }
        mask
    }
}

/// Per-session learned templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptedTemplateStore {
    templates: CompiledTemplates,
    classes: Vec<AdaptiveClass>,
    num_perm_classes: usize,
    num_nonempty_classes: usize,
}

impl AdaptedTemplateStore {
    /// Creates a store with `num_classes` empty classes
    pub fn new(num_classes: usize) -> Self {
        Self {
            templates: CompiledTemplates::new(num_classes),
            classes: (0..num_classes).map(|_| AdaptiveClass::new()).collect(),
            num_perm_classes: 0,
            num_nonempty_classes: 0,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Classes with at least one permanent config
    pub fn num_perm_classes(&self) -> usize {
        self.num_perm_classes
    }

    /// Classes that have been bootstrapped
    pub fn num_nonempty_classes(&self) -> usize {
        self.num_nonempty_classes
    }

    pub fn templates(&self) -> &CompiledTemplates {
        &self.templates
    }

    pub fn class(&self, class_id: ClassId) -> Option<&AdaptiveClass> {
        self.classes.get(class_id.index())
    }

    pub fn compiled(&self, class_id: ClassId) -> Option<&CompiledClass> {
        self.templates.class(class_id)
    }

    /// Returns true for empty or unknown classes
    pub fn is_empty_class(&self, class_id: ClassId) -> bool {
        self.class(class_id).is_none_or(AdaptiveClass::is_empty)
    }

    /// Checks that a deserialized store is internally consistent and
    /// sized for an alphabet of `num_classes`
    pub fn validate(&self, num_classes: usize) -> ClassifyResult<()> {
        let invalid = |msg: String| Err(ClassifyError::InvalidParameter(msg));
        if self.classes.len() != num_classes {
            return invalid(format!(
                "templates have {} classes, class table has {}",
                self.classes.len(),
                num_classes
            ));
        }
        if self.templates.num_classes() != num_classes {
            return invalid(format!(
                "compiled templates have {} classes, class table has {}",
                self.templates.num_classes(),
                num_classes
            ));
        }
        for ((class_id, compiled), class) in self.templates.iter().zip(&self.classes) {
            if let Some(msg) = compiled.inconsistency() {
                return invalid(format!("class {}: {}", class_id, msg));
            }
            if class.configs.len() != compiled.num_configs() {
                return invalid(format!(
                    "class {}: {} configs but {} compiled",
                    class_id,
                    class.configs.len(),
                    compiled.num_configs()
                ));
            }
            let temp_masks_ok = class.configs.iter().all(|c| match c {
                AdaptedConfig::Temporary(t) => t.protos.is_well_formed(),
                AdaptedConfig::Permanent(_) => true,
            });
            if !temp_masks_ok
                || !class.perm_protos.is_well_formed()
                || !class.perm_configs.is_well_formed()
            {
                return invalid(format!("class {}: malformed mask", class_id));
            }
            if class
                .temp_protos
                .iter()
                .any(|tp| tp.proto_id >= compiled.num_protos())
            {
                return invalid(format!("class {}: dangling temporary proto", class_id));
            }
            let permanent = class.configs.iter().filter(|c| c.is_permanent()).count();
            if class.num_perm_configs != permanent {
                return invalid(format!(
                    "class {}: {} permanent configs recorded, {} found",
                    class_id, class.num_perm_configs, permanent
                ));
            }
        }
        let perm_classes = self.classes.iter().filter(|c| c.num_perm_configs > 0).count();
        let nonempty = self.classes.iter().filter(|c| !c.is_empty()).count();
        if self.num_perm_classes != perm_classes || self.num_nonempty_classes != nonempty {
            return invalid("class counters do not match the classes".to_string());
        }
        Ok(())
    }

    fn check_class(&self, class_id: ClassId) -> ClassifyResult<()> {
        if class_id.index() >= self.classes.len() {
            return Err(ClassifyError::InvalidClassId {
                class_id,
                num_classes: self.classes.len(),
            });
        }
        Ok(())
    }

    /// Bootstraps an empty class: every outline feature becomes a proto and
    /// config 0 uses all of them. Returns the number of protos created.
    pub fn init_class(
        &mut self,
        class_id: ClassId,
        font_id: FontId,
        features: &[Feature],
    ) -> ClassifyResult<usize> {
        self.check_class(class_id)?;
        if !self.is_empty_class(class_id) {
            return Err(ClassifyError::InvalidParameter(format!(
                "class {} is already initialized",
                class_id
            )));
        }
        if features.is_empty() {
            return Err(ClassifyError::InputRejected { num_features: 0 });
        }
        let i = class_id.index();
        let compiled = &mut self.templates.classes[i];
        if features.len() > compiled.proto_capacity_left() {
            return Err(ClassifyError::CapacityExhausted {
                class_id,
                what: "protos",
            });
        }
        let class = &mut self.classes[i];

        let mut mask = ProtoMask::new(MAX_NUM_PROTOS);
        for f in features {
            let proto = Proto::new(f.x, f.y, f.direction, f.length);
            if let Some(pid) = compiled.add_proto(proto) {
                mask.set(pid);
                class.temp_protos.push(TempProto {
                    proto_id: pid,
                    proto,
                });
            }
        }
        compiled.add_config(mask.clone());
        class.configs.push(AdaptedConfig::Temporary(TempConfig {
            times_seen: 1,
            max_proto_id: features.len() - 1,
            protos: mask,
            font_id,
        }));
        class.max_times_seen = class.max_times_seen.max(1);
        self.num_nonempty_classes += 1;
        Ok(features.len())
    }

    /// Adds a temporary config made of existing `good_protos` plus
    /// `new_protos`. Fails without side effects when the class is full.
    pub fn add_temporary_config(
        &mut self,
        class_id: ClassId,
        font_id: FontId,
        good_protos: &[ProtoId],
        new_protos: &[Proto],
    ) -> ClassifyResult<ConfigId> {
        self.check_class(class_id)?;
        let i = class_id.index();
        let compiled = &mut self.templates.classes[i];
        if compiled.num_configs() >= MAX_NUM_CONFIGS {
            return Err(ClassifyError::CapacityExhausted {
                class_id,
                what: "configs",
            });
        }
        if new_protos.len() > compiled.proto_capacity_left() {
            return Err(ClassifyError::CapacityExhausted {
                class_id,
                what: "protos",
            });
        }
        let class = &mut self.classes[i];

        let mut mask = ProtoMask::new(MAX_NUM_PROTOS);
        for &pid in good_protos.iter().filter(|&&p| p < compiled.num_protos()) {
            mask.set(pid);
        }
        for &proto in new_protos {
            if let Some(pid) = compiled.add_proto(proto) {
                mask.set(pid);
                class.temp_protos.push(TempProto {
                    proto_id: pid,
                    proto,
                });
            }
        }
        let config_id = compiled
            .add_config(mask.clone())
            .ok_or(ClassifyError::CapacityExhausted {
                class_id,
                what: "configs",
            })?;
        class.configs.push(AdaptedConfig::Temporary(TempConfig {
            times_seen: 1,
            max_proto_id: compiled.num_protos().saturating_sub(1),
            protos: mask,
            font_id,
        }));
        class.max_times_seen = class.max_times_seen.max(1);
        Ok(config_id)
    }

    /// Records another sighting of a temporary config. Returns the new
    /// count, or `None` if the config is permanent or missing.
    pub fn increase_confidence(&mut self, class_id: ClassId, config_id: ConfigId) -> Option<u32> {
        let class = self.classes.get_mut(class_id.index())?;
        let AdaptedConfig::Temporary(temp) = class.configs.get_mut(config_id)? else {
            return None;
        };
        temp.times_seen += 1;
        let seen = temp.times_seen;
        class.max_times_seen = class.max_times_seen.max(seen);
        Some(seen)
    }

    /// Promotes a temporary config in place
    ///
    /// The protos the config owns become permanent and are handed to the
    /// class pruner. Returns `Ok(false)` if the config was already
    /// permanent.
    pub fn make_permanent(
        &mut self,
        class_id: ClassId,
        config_id: ConfigId,
        ambigs: Vec<ClassId>,
    ) -> ClassifyResult<bool> {
        self.check_class(class_id)?;
        let i = class_id.index();
        let class = &mut self.classes[i];
        let compiled = &mut self.templates.classes[i];
        let slot = class
            .configs
            .get_mut(config_id)
            .ok_or(ClassifyError::InvalidParameter(format!(
                "class {} has no config {}",
                class_id, config_id
            )))?;
        let font_id = match slot {
            AdaptedConfig::Permanent(_) => return Ok(false),
            AdaptedConfig::Temporary(t) => t.font_id,
        };
        let AdaptedConfig::Temporary(temp) =
            std::mem::replace(slot, AdaptedConfig::Permanent(PermConfig { ambigs, font_id }))
        else {
            return Ok(false);
        };

        class.perm_configs.set(config_id);
        if class.num_perm_configs == 0 {
            self.num_perm_classes += 1;
        }
        class.num_perm_configs += 1;

        let perm_protos = &mut class.perm_protos;
        class.temp_protos.retain(|tp| {
            if tp.proto_id <= temp.max_proto_id && temp.protos.test(tp.proto_id) {
                perm_protos.set(tp.proto_id);
                compiled.add_pruner_proto(tp.proto_id);
                false
            } else {
                true
            }
        });
        Ok(true)
    }
}
