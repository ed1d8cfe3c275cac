use crate::entity::{EntityData, EntityWithSlotsData};
use crate::fields;
use crate::part::{EnginePartData, PartData, RadarPartData, WeaponPartData};
use crate::value::{FieldValue, RecordTag, string};
use crate::DataError;
use std::sync::Arc;
use stellar_geometry::Model;
use stellar_ids::{ModelHandle, SpawnId};

/// Reserved constructor key selecting the record kind.
pub const KIND_KEY: &str = "kind";

/// Model reference plus the asset it resolves to.
#[derive(Clone, Debug)]
pub struct ModelRef {
    pub handle: ModelHandle,
    pub model: Option<Arc<Model>>,
}

impl ModelRef {
    pub fn new(handle: ModelHandle) -> Self {
        Self {
            handle,
            model: None,
        }
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BaseData {
    pub spawn_id: Option<SpawnId>,
    /// Engine type expression, e.g. `ENTITY_TYPEREF_SHIP`.
    pub type_name: Option<String>,
    pub model: Option<ModelRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VariantData {
    Entity(EntityData),
    Slotted(EntityWithSlotsData),
    Part(PartData),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Entity,
    Slotted,
    Engine,
    Weapon,
    Radar,
}

impl RecordKind {
    pub const fn name(self) -> &'static str {
        match self {
            RecordKind::Entity => "entity",
            RecordKind::Slotted => "slotted",
            RecordKind::Engine => "engine",
            RecordKind::Weapon => "weapon",
            RecordKind::Radar => "radar",
        }
    }

    pub const fn tag(self) -> RecordTag {
        match self {
            RecordKind::Entity | RecordKind::Slotted => RecordTag::Entity,
            RecordKind::Engine | RecordKind::Weapon | RecordKind::Radar => RecordTag::Part,
        }
    }

    fn parse(kind: &str, constructor: RecordTag) -> Result<Self, DataError> {
        let found = match kind {
            "entity" => RecordKind::Entity,
            "slotted" => RecordKind::Slotted,
            "engine" => RecordKind::Engine,
            "weapon" => RecordKind::Weapon,
            "radar" => RecordKind::Radar,
            _ => return Err(unknown_kind(kind, constructor)),
        };
        if found.tag() != constructor {
            return Err(unknown_kind(kind, constructor));
        }
        Ok(found)
    }
}

fn unknown_kind(kind: &str, constructor: RecordTag) -> DataError {
    DataError::UnknownDataType {
        kind: kind.to_string(),
        constructor: constructor.name(),
    }
}

/// Entity or part template. Records are values: every field assignment goes
/// through [`Record::with_field`] and produces a new record.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub base: BaseData,
    pub data: VariantData,
}

impl Record {
    /// Empty record of the given kind; every field unset.
    pub fn empty(kind: RecordKind) -> Self {
        let data = match kind {
            RecordKind::Entity => VariantData::Entity(EntityData::default()),
            RecordKind::Slotted => VariantData::Slotted(EntityWithSlotsData::default()),
            RecordKind::Engine => VariantData::Part(PartData::Engine(EnginePartData::default())),
            RecordKind::Weapon => VariantData::Part(PartData::Weapon(WeaponPartData::default())),
            RecordKind::Radar => VariantData::Part(PartData::Radar(RadarPartData::default())),
        };
        Self {
            base: BaseData::default(),
            data,
        }
    }

    /// Builds a record from constructor table entries. `kind` picks the
    /// variant (entities default to `entity`, parts must name one).
    pub fn construct(
        constructor: RecordTag,
        entries: Vec<(String, FieldValue)>,
    ) -> Result<Self, DataError> {
        let mut kind = match constructor {
            RecordTag::Entity => Some(RecordKind::Entity),
            RecordTag::Part => None,
        };
        let mut fields = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            if key == KIND_KEY {
                let name = string(&value).map_err(|m| DataError::TypeMismatch {
                    field: key.clone(),
                    type_tag: constructor.name(),
                    expected: m.expected,
                    found: m.found,
                })?;
                kind = Some(RecordKind::parse(&name, constructor)?);
            } else {
                fields.push((key, value));
            }
        }
        let kind = kind.ok_or_else(|| unknown_kind("<missing>", constructor))?;
        Self::empty(kind).with_fields(fields)
    }

    pub fn kind(&self) -> RecordKind {
        match &self.data {
            VariantData::Entity(_) => RecordKind::Entity,
            VariantData::Slotted(_) => RecordKind::Slotted,
            VariantData::Part(PartData::Engine(_)) => RecordKind::Engine,
            VariantData::Part(PartData::Weapon(_)) => RecordKind::Weapon,
            VariantData::Part(PartData::Radar(_)) => RecordKind::Radar,
        }
    }

    pub fn tag(&self) -> RecordTag {
        self.kind().tag()
    }

    pub fn type_tag(&self) -> &'static str {
        self.kind().name()
    }

    pub fn spawn_id(&self) -> Option<SpawnId> {
        self.base.spawn_id
    }

    pub fn model(&self) -> Option<&Arc<Model>> {
        self.base.model.as_ref().and_then(|m| m.model.as_ref())
    }

    /// Entity fields, shared by plain and slotted entities.
    pub fn entity(&self) -> Option<&EntityData> {
        match &self.data {
            VariantData::Entity(entity) => Some(entity),
            VariantData::Slotted(slotted) => Some(&slotted.entity),
            VariantData::Part(_) => None,
        }
    }

    pub fn part(&self) -> Option<&PartData> {
        match &self.data {
            VariantData::Part(part) => Some(part),
            _ => None,
        }
    }

    /// Returns a copy with one field overridden.
    pub fn with_field(mut self, key: &str, value: &FieldValue) -> Result<Self, DataError> {
        fields::apply(&mut self, key, value)?;
        Ok(self)
    }

    pub fn with_fields(self, entries: Vec<(String, FieldValue)>) -> Result<Self, DataError> {
        entries
            .into_iter()
            .try_fold(self, |record, (key, value)| record.with_field(&key, &value))
    }

    /// Script-level extension: the copy is a fresh template, so it drops the
    /// spawn id of a spawned original.
    pub fn extend(&self, entries: Vec<(String, FieldValue)>) -> Result<Self, DataError> {
        let mut next = self.clone();
        next.base.spawn_id = None;
        next.with_fields(entries)
    }
}
