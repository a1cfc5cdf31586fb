use std::fmt::{self, Display, Formatter, Write};

use serde::{Deserialize, Serialize};

/// Resource name shared by every method a software entity exposes.
pub const RPC_RESOURCE_NAME: &str = "rpc";

/// First numeric resource id reserved for topics. Method ids sit below it.
pub const MIN_TOPIC_ID: u32 = 0x8000;

/// The software entity (service) that owns a resource.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Entity {
    /// Name of the entity, e.g. `body.access`.
    pub name: String,

    /// Major version of the entity's API.
    pub version_major: Option<u32>,
}

impl Entity {
    /// Creates an entity with an optional major version.
    pub fn new<N>(name: N, version_major: Option<u32>) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            version_major,
        }
    }
}

/// A resource exposed by an entity: either a topic or a method.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Resource {
    /// Resource name. Methods all use [`RPC_RESOURCE_NAME`].
    pub name: String,

    /// Resource instance. For methods this is the method name.
    pub instance: Option<String>,

    /// Message type published on the resource, if any.
    pub message: Option<String>,

    /// Numeric resource id.
    pub id: Option<u32>,
}

impl Resource {
    /// Creates a method resource (`rpc.<method>`).
    pub fn rpc_method<M>(method: M) -> Self
    where
        M: Into<String>,
    {
        Self {
            name: RPC_RESOURCE_NAME.to_string(),
            instance: Some(method.into()),
            message: None,
            id: None,
        }
    }

    /// Creates a method resource addressed only by its numeric id.
    #[must_use]
    pub fn rpc_method_id(id: u32) -> Self {
        Self {
            name: RPC_RESOURCE_NAME.to_string(),
            instance: None,
            message: None,
            id: Some(id),
        }
    }

    /// Creates a topic resource.
    pub fn topic<N>(name: N, instance: Option<String>, message: Option<String>) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            instance,
            message,
            id: None,
        }
    }

    /// Whether the resource denotes a callable method rather than a topic.
    #[must_use]
    pub fn is_rpc_method(&self) -> bool {
        self.name == RPC_RESOURCE_NAME
            && (self.instance.as_deref().is_some_and(|i| !i.is_empty())
                || self.id.is_some_and(|id| (1..MIN_TOPIC_ID).contains(&id)))
    }

    fn write_long_form(&self, out: &mut String) {
        out.push_str(&self.name);
        if let Some(instance) = self.instance.as_deref().filter(|i| !i.is_empty()) {
            out.push('.');
            out.push_str(instance);
        }
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            out.push('#');
            out.push_str(message);
        }
    }
}

/// Address of a resource, optionally on a remote authority.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Uri {
    /// Remote authority (device or domain). `None` addresses the local authority.
    pub authority: Option<String>,

    /// Owning entity.
    pub entity: Entity,

    /// Addressed resource.
    pub resource: Resource,
}

impl Uri {
    /// Creates a local address.
    #[must_use]
    pub const fn new(entity: Entity, resource: Resource) -> Self {
        Self {
            authority: None,
            entity,
            resource,
        }
    }

    /// Creates a local address for a method on an entity.
    pub fn rpc_method<N, M>(entity: N, version_major: Option<u32>, method: M) -> Self
    where
        N: Into<String>,
        M: Into<String>,
    {
        Self::new(
            Entity::new(entity, version_major),
            Resource::rpc_method(method),
        )
    }

    /// Returns the same address scoped to a remote authority.
    #[must_use]
    pub fn with_authority<A>(mut self, authority: A) -> Self
    where
        A: Into<String>,
    {
        self.authority = Some(authority.into());
        self
    }

    /// Whether every component of the address is unset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Whether the address denotes a callable method.
    #[must_use]
    pub fn is_rpc_method(&self) -> bool {
        self.resource.is_rpc_method()
    }

    /// Serializes the address to its canonical long form,
    /// `//authority/entity/version/resource.instance#message`.
    ///
    /// An empty address serializes to an empty string.
    #[must_use]
    pub fn to_long_form(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        if let Some(authority) = self.authority.as_deref().filter(|a| !a.is_empty()) {
            out.push_str("//");
            out.push_str(authority);
        }
        out.push('/');
        out.push_str(&self.entity.name);
        out.push('/');
        if let Some(version) = self.entity.version_major {
            let _ = write!(out, "{version}");
        }
        out.push('/');
        self.resource.write_long_form(&mut out);
        out
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_long_form())
    }
}
