//! Fixture helpers for building typed test data.
//!
//! Each entity type is described by an [`EntityKind`]: the ordered
//! arguments its builder takes, the field that links it to a parent, and
//! which child types it can build (and through which field the child links
//! back). A [`Fixture`] keeps track of everything it creates so a test can
//! tear it all down again with [`Fixture::delete_all`].

use crate::batch::BatchResult;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::{EntityType, Link, Map, Record, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Field every child inherits from its parent's project.
pub const PROJECT_FIELD: &str = "project";

/// Step short names created by [`Fixture::default_steps`].
pub const DEFAULT_STEPS: [&str; 12] = [
    "Client", "Online", "Roto", "MM", "Anm", "FX", "Light", "Comp", "Art", "Model", "Rig",
    "Surface",
];

/// What happens when an argument is not supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentDefault {
    /// Creation fails.
    Required,
    /// This value is used.
    Value(Value),
}

/// One argument of an entity builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub default: ArgumentDefault,
}

impl Argument {
    /// An argument that must be supplied.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: ArgumentDefault::Required,
        }
    }

    /// An argument that falls back to `default`.
    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: ArgumentDefault::Value(default.into()),
        }
    }
}

/// Describes how fixtures of one entity type are built.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityKind {
    pub entity_type: EntityType,
    pub arguments: Vec<Argument>,
    /// Field linking a record to its parent, if it has one.
    pub parent_field: Option<String>,
    /// Child type to the child's field that links back to this kind.
    pub backrefs: BTreeMap<EntityType, String>,
}

impl EntityKind {
    /// A kind with no arguments, parent or children.
    pub fn new(entity_type: impl Into<EntityType>) -> Self {
        Self {
            entity_type: entity_type.into(),
            arguments: Vec::new(),
            parent_field: None,
            backrefs: BTreeMap::new(),
        }
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn parent(mut self, field: impl Into<String>) -> Self {
        self.parent_field = Some(field.into());
        self
    }

    /// Allow building `child` under this kind, linked back through `field`.
    pub fn backref(mut self, child: impl Into<EntityType>, field: impl Into<String>) -> Self {
        self.backrefs.insert(child.into(), field.into());
        self
    }
}

/// Registry of entity kinds.
#[derive(Debug, Clone, Default)]
pub struct EntityKinds {
    kinds: HashMap<EntityType, EntityKind>,
}

impl EntityKinds {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The production hierarchy: projects hold sequences and assets,
    /// sequences hold shots, shots and assets hold tasks.
    pub fn standard() -> Self {
        let mut kinds = Self::empty();
        kinds.register(
            EntityKind::new("Project")
                .argument(Argument::required("name"))
                .backref("Sequence", "project")
                .backref("Asset", "project"),
        );
        kinds.register(
            EntityKind::new("Sequence")
                .argument(Argument::required("code"))
                .parent("project")
                .backref("Shot", "sg_sequence"),
        );
        kinds.register(
            EntityKind::new("Shot")
                .argument(Argument::required("code"))
                .parent("sg_sequence")
                .backref("Task", "entity"),
        );
        kinds.register(
            EntityKind::new("Task")
                .argument(Argument::required("content"))
                .parent("entity"),
        );
        kinds.register(EntityKind::new("Step").argument(Argument::required("short_name")));
        kinds.register(
            EntityKind::new("Asset")
                .argument(Argument::required("code"))
                .argument(Argument::optional("sg_asset_type", "Generic"))
                .parent("project")
                .backref("Task", "entity"),
        );
        kinds
    }

    /// Register a kind, replacing any previous one for the same type.
    pub fn register(&mut self, kind: EntityKind) {
        self.kinds.insert(kind.entity_type.clone(), kind);
    }

    pub fn get(&self, entity_type: &str) -> Option<&EntityKind> {
        self.kinds.get(entity_type)
    }

    /// The registered kind, or an argument-less kind for unknown types.
    pub fn kind_for(&self, entity_type: &str) -> EntityKind {
        self.get(entity_type)
            .cloned()
            .unwrap_or_else(|| EntityKind::new(entity_type))
    }
}

/// Test data factory wrapping a [`Session`].
#[derive(Debug)]
pub struct Fixture {
    session: Session,
    kinds: EntityKinds,
    created: Vec<Link>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new(Session::new())
    }
}

impl Fixture {
    /// A fixture over `session` using the standard kinds.
    pub fn new(session: Session) -> Self {
        Self::with_kinds(session, EntityKinds::standard())
    }

    pub fn with_kinds(session: Session, kinds: EntityKinds) -> Self {
        Self {
            session,
            kinds,
            created: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn kinds(&self) -> &EntityKinds {
        &self.kinds
    }

    /// Links to everything created so far, oldest first.
    pub fn created(&self) -> &[Link] {
        &self.created
    }

    /// Create a record and remember it for [`Fixture::delete_all`].
    pub fn create(
        &mut self,
        entity_type: &str,
        data: impl Into<Value>,
        return_fields: &[&str],
    ) -> Result<Record> {
        let record = self.session.create(entity_type, data, return_fields)?;
        self.created.push(record.link());
        Ok(record)
    }

    /// Find a record whose fields all equal `data`, or create one.
    ///
    /// Any `id` in `data` is used to search but dropped when creating.
    pub fn find_or_create(&mut self, entity_type: &str, data: impl Into<Value>) -> Result<Record> {
        let data = match data.into() {
            Value::Map(map) => map,
            other => {
                return Err(Error::InvalidData(format!(
                    "data must be a mapping, got {}",
                    other.type_name()
                )))
            }
        };

        let filters: Value = data
            .iter()
            .map(|(field, value)| {
                Value::List(vec![
                    Value::from(field.as_str()),
                    Value::from("is"),
                    value.clone(),
                ])
            })
            .collect();
        let fields: Vec<&str> = data.keys().map(String::as_str).collect();
        if let Some(found) = self.session.find_one(entity_type, &filters, fields.as_slice())? {
            debug!(entity_type, id = found.id(), "found existing fixture");
            return Ok(found);
        }

        let mut data = data;
        data.remove("id");
        let fields: Vec<String> = data.keys().cloned().collect();
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        self.create(entity_type, data, &fields)
    }

    /// [`Fixture::find_or_create`] for each mapping in turn.
    pub fn find_or_create_many<I, D>(&mut self, entity_type: &str, data: I) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = D>,
        D: Into<Value>,
    {
        data.into_iter()
            .map(|datum| self.find_or_create(entity_type, datum))
            .collect()
    }

    /// Delete everything this fixture created, newest first, in one batch.
    pub fn delete_all(&mut self) -> Result<Vec<BatchResult>> {
        if self.created.is_empty() {
            return Ok(Vec::new());
        }
        let requests: Vec<Value> = self
            .created
            .iter()
            .rev()
            .map(|link| {
                let mut request = Map::new();
                request.insert("request_type".to_string(), Value::from("delete"));
                request.insert("entity_type".to_string(), Value::from(link.entity_type.as_str()));
                request.insert("entity_id".to_string(), Value::from(link.id));
                Value::Map(request)
            })
            .collect();
        let results = self.session.batch(&requests)?;
        self.created.clear();
        Ok(results)
    }

    /// The standard pipeline steps keyed by short name.
    pub fn default_steps(&mut self) -> Result<BTreeMap<String, Record>> {
        DEFAULT_STEPS
            .iter()
            .map(|code| {
                let mut data = Map::new();
                data.insert("code".to_string(), Value::from(*code));
                data.insert("short_name".to_string(), Value::from(*code));
                Ok((code.to_string(), self.find_or_create("Step", data)?))
            })
            .collect()
    }

    /// Start building a top-level record.
    pub fn build(&mut self, entity_type: &str) -> Creator<'_> {
        let kind = self.kinds.kind_for(entity_type);
        Creator::new(self, kind, None)
    }

    /// Start building a record under `parent`.
    ///
    /// `child_type` must be one of the parent kind's backrefs.
    pub fn build_child(&mut self, parent: &Record, child_type: &str) -> Result<Creator<'_>> {
        let parent_kind = self.kinds.kind_for(parent.entity_type());
        let Some(backref) = parent_kind.backrefs.get(child_type) else {
            return Err(Error::NotAChildType {
                parent: parent.entity_type().to_string(),
                child: child_type.to_string(),
            });
        };
        let parent = ParentLink {
            backref: backref.clone(),
            link: parent.link(),
            project: parent.get(PROJECT_FIELD).cloned(),
        };
        let kind = self.kinds.kind_for(child_type);
        Ok(Creator::new(self, kind, Some(parent)))
    }
}

/// What a child needs to know about its parent.
#[derive(Debug, Clone)]
struct ParentLink {
    backref: String,
    link: Link,
    project: Option<Value>,
}

/// Collects arguments for one fixture record.
#[derive(Debug)]
pub struct Creator<'a> {
    fixture: &'a mut Fixture,
    kind: EntityKind,
    parent: Option<ParentLink>,
    positional: Vec<Value>,
    named: Map,
}

impl<'a> Creator<'a> {
    fn new(fixture: &'a mut Fixture, kind: EntityKind, parent: Option<ParentLink>) -> Self {
        Self {
            fixture,
            kind,
            parent,
            positional: Vec::new(),
            named: Map::new(),
        }
    }

    /// Supply the next positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Supply a field by name.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Create the record.
    ///
    /// Each argument is taken by name, else from the next positional value,
    /// else from its default. Children also get a link back to their parent
    /// and the parent's project.
    pub fn create(self) -> Result<Record> {
        let Creator {
            fixture,
            kind,
            parent,
            positional,
            mut named,
        } = self;

        let slots = kind
            .arguments
            .iter()
            .filter(|argument| !named.contains_key(&argument.name))
            .count();
        if positional.len() > slots {
            return Err(Error::TooManyArguments {
                entity_type: kind.entity_type,
                expected: slots,
                got: positional.len(),
            });
        }

        let mut positional = positional.into_iter();
        for argument in &kind.arguments {
            if named.contains_key(&argument.name) {
                continue;
            }
            let value = match (positional.next(), &argument.default) {
                (Some(value), _) => value,
                (None, ArgumentDefault::Value(default)) => default.clone(),
                (None, ArgumentDefault::Required) => {
                    return Err(Error::MissingRequiredArgument {
                        entity_type: kind.entity_type,
                        argument: argument.name.clone(),
                    })
                }
            };
            named.insert(argument.name.clone(), value);
        }

        if let Some(parent) = parent {
            named.insert(parent.backref, parent.link.to_value());
            if parent.link.entity_type == "Project" {
                named.insert(PROJECT_FIELD.to_string(), parent.link.to_value());
            } else if let Some(project) = parent.project {
                named.insert(PROJECT_FIELD.to_string(), project);
            }
        }

        let fields: Vec<String> = named.keys().cloned().collect();
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        let record = fixture.create(&kind.entity_type, named, &fields)?;
        debug!(entity_type = %kind.entity_type, id = record.id(), "created fixture");
        Ok(record)
    }
}
