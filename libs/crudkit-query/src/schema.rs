//! Static entity descriptors.
//!
//! Every filter, update, page and include request is validated against an
//! [`EntitySchema`]. Descriptors are `const`-constructible so that modules
//! can declare them as `static` items next to their models.

use crate::value::FieldType;

/// One declared scalar field of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
    pub sortable: bool,
    pub updatable: bool,
}

impl FieldSpec {
    /// A non-null, sortable, updatable field.
    #[must_use]
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            sortable: true,
            updatable: true,
        }
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Excluded from update requests (ids, foreign keys, timestamps).
    #[must_use]
    pub const fn readonly(mut self) -> Self {
        self.updatable = false;
        self
    }

    #[must_use]
    pub const fn unsorted(mut self) -> Self {
        self.sortable = false;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cardinality {
    One,
    Many,
}

/// A named relation from one entity to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelationSpec {
    pub name: &'static str,
    /// Name of the target [`EntitySchema`].
    pub target: &'static str,
    pub cardinality: Cardinality,
}

impl RelationSpec {
    #[must_use]
    pub const fn to_one(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            target,
            cardinality: Cardinality::One,
        }
    }

    #[must_use]
    pub const fn to_many(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            target,
            cardinality: Cardinality::Many,
        }
    }
}

/// Declared fields and relations of one entity type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntitySchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    pub relations: &'static [RelationSpec],
}

impl EntitySchema {
    #[must_use]
    pub const fn new(
        name: &'static str,
        fields: &'static [FieldSpec],
        relations: &'static [RelationSpec],
    ) -> Self {
        Self {
            name,
            fields,
            relations,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&'static RelationSpec> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn sortable_fields(&self) -> impl Iterator<Item = &'static FieldSpec> + 'static {
        self.fields.iter().filter(|f| f.sortable)
    }

    pub fn updatable_fields(&self) -> impl Iterator<Item = &'static FieldSpec> + 'static {
        self.fields.iter().filter(|f| f.updatable)
    }
}
