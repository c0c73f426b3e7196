//! Domain types for stacksync templates.
//!
//! Resource property bags stay as `serde_json` values; structural comparison
//! of sanitized templates relies on their `PartialEq`. Resource types are a
//! closed enumeration with an `Other` fallback so the field-strip table can
//! be a compile-time lookup instead of string matching.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed control-plane stack name (logical for the root stack,
/// physical resource id for nested stacks).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StackName(pub String);

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for StackName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StackName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A hierarchical, `/`-joined path naming a resource across nested stack
/// boundaries (`Parent/Child`).
///
/// This is a name, not a lookup — no validation of referenced-resource
/// existence is performed. Equality and hashing are by full path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier(pub String);

impl ResourceIdentifier {
    /// The empty prefix used for root-stack resources.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Append a child logical id, yielding `parent/child`.
    pub fn join(&self, child_logical_id: &str) -> Self {
        if self.0.is_empty() {
            Self(child_logical_id.to_owned())
        } else {
            Self(format!("{}/{}", self.0, child_logical_id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ResourceIdentifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceIdentifier {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

/// The resource types the sync engine knows how to reconcile, plus a
/// fallback for everything else (compared verbatim, never code-synced).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    ServerlessFunction,
    LambdaFunction,
    ServerlessLayer,
    LambdaLayer,
    ServerlessApi,
    RestApi,
    ServerlessHttpApi,
    HttpApi,
    ServerlessStateMachine,
    StateMachine,
    ServerlessApplication,
    NestedStack,
    Other(String),
}

impl ResourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ServerlessFunction => "AWS::Serverless::Function",
            Self::LambdaFunction => "AWS::Lambda::Function",
            Self::ServerlessLayer => "AWS::Serverless::LayerVersion",
            Self::LambdaLayer => "AWS::Lambda::LayerVersion",
            Self::ServerlessApi => "AWS::Serverless::Api",
            Self::RestApi => "AWS::ApiGateway::RestApi",
            Self::ServerlessHttpApi => "AWS::Serverless::HttpApi",
            Self::HttpApi => "AWS::ApiGatewayV2::Api",
            Self::ServerlessStateMachine => "AWS::Serverless::StateMachine",
            Self::StateMachine => "AWS::StepFunctions::StateMachine",
            Self::ServerlessApplication => "AWS::Serverless::Application",
            Self::NestedStack => "AWS::CloudFormation::Stack",
            Self::Other(s) => s,
        }
    }

    /// Whether this resource indirectly contains another template (a nested
    /// stack or a linked serverless application).
    pub fn is_stack_like(&self) -> bool {
        matches!(self, Self::NestedStack | Self::ServerlessApplication)
    }
}

impl From<&str> for ResourceKind {
    fn from(s: &str) -> Self {
        match s {
            "AWS::Serverless::Function" => Self::ServerlessFunction,
            "AWS::Lambda::Function" => Self::LambdaFunction,
            "AWS::Serverless::LayerVersion" => Self::ServerlessLayer,
            "AWS::Lambda::LayerVersion" => Self::LambdaLayer,
            "AWS::Serverless::Api" => Self::ServerlessApi,
            "AWS::ApiGateway::RestApi" => Self::RestApi,
            "AWS::Serverless::HttpApi" => Self::ServerlessHttpApi,
            "AWS::ApiGatewayV2::Api" => Self::HttpApi,
            "AWS::Serverless::StateMachine" => Self::ServerlessStateMachine,
            "AWS::StepFunctions::StateMachine" => Self::StateMachine,
            "AWS::Serverless::Application" => Self::ServerlessApplication,
            "AWS::CloudFormation::Stack" => Self::NestedStack,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for ResourceKind {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Resource model
// ---------------------------------------------------------------------------

/// One entry of a template's `Resources` section.
///
/// `metadata` is build/tooling-only and is removed before comparison.
/// Any other top-level keys (`DependsOn`, `Condition`, …) are captured in
/// `extra` so they participate in structural equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    pub kind: ResourceKind,

    #[serde(rename = "Properties", default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,

    #[serde(rename = "Metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            properties: Map::new(),
            metadata: None,
            extra: Map::new(),
        }
    }
}

/// A stack's resources, keyed by logical id. `BTreeMap` keeps iteration and
/// comparison order deterministic.
pub type Template = BTreeMap<String, Resource>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
