//! Earth Engine expression graphs.
//!
//! Serde models for the REST `Expression` message: a table of named value
//! nodes plus the id of the result node. Handles in [`crate::ee`] build a
//! nested [`ValueNode`] tree; [`Expression::new`] flattens it, hoisting
//! every function invocation into the table and de-duplicating identical
//! sub-graphs so shared inputs (the composite, the AOI) are sent once.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{CloudError, Result};

/// One node of an expression graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueNode {
    ConstantValue(serde_json::Value),
    ValueReference(String),
    FunctionInvocationValue(FunctionInvocation),
    ArrayValue(ArrayValue),
    DictionaryValue(DictionaryValue),
}

/// Call of a server-side algorithm with named arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInvocation {
    pub function_name: String,
    pub arguments: BTreeMap<String, ValueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Vec<ValueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryValue {
    pub values: BTreeMap<String, ValueNode>,
}

impl ValueNode {
    pub fn constant(value: impl Into<serde_json::Value>) -> Self {
        Self::ConstantValue(value.into())
    }

    /// Invocation of `function_name` with the given arguments.
    pub fn invoke<I, K>(function_name: &str, arguments: I) -> Self
    where
        I: IntoIterator<Item = (K, ValueNode)>,
        K: Into<String>,
    {
        Self::FunctionInvocationValue(FunctionInvocation {
            function_name: function_name.to_string(),
            arguments: arguments
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        })
    }

    pub fn array(values: Vec<ValueNode>) -> Self {
        Self::ArrayValue(ArrayValue { values })
    }

    pub fn dictionary<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, ValueNode)>,
        K: Into<String>,
    {
        Self::DictionaryValue(DictionaryValue {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }
}

/// A flattened expression ready to be sent to `value:compute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub result: String,
    pub values: BTreeMap<String, ValueNode>,
}

impl Expression {
    /// Flatten a nested node tree.
    pub fn new(root: ValueNode) -> Result<Self> {
        let mut interner = Interner::default();
        let root = interner.intern(root)?;

        let result = match root {
            ValueNode::ValueReference(id) => id,
            other => {
                let id = interner.next_id();
                interner.values.insert(id.clone(), other);
                id
            }
        };

        Ok(Self {
            result,
            values: interner.values,
        })
    }

    /// Number of nodes in the value table.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of all invoked functions, one entry per distinct node.
    pub fn function_names(&self) -> Vec<&str> {
        self.values
            .values()
            .filter_map(|v| match v {
                ValueNode::FunctionInvocationValue(f) => Some(f.function_name.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Default)]
struct Interner {
    values: BTreeMap<String, ValueNode>,
    seen: HashMap<String, String>,
}

impl Interner {
    fn next_id(&self) -> String {
        self.values.len().to_string()
    }

    fn intern(&mut self, node: ValueNode) -> Result<ValueNode> {
        match node {
            ValueNode::FunctionInvocationValue(inv) => {
                let mut arguments = BTreeMap::new();
                for (name, arg) in inv.arguments {
                    arguments.insert(name, self.intern(arg)?);
                }
                let inv = FunctionInvocation {
                    function_name: inv.function_name,
                    arguments,
                };

                let key = serde_json::to_string(&inv)
                    .map_err(|e| CloudError::Decode(format!("serializing expression: {e}")))?;
                if let Some(id) = self.seen.get(&key) {
                    return Ok(ValueNode::ValueReference(id.clone()));
                }

                let id = self.next_id();
                self.values
                    .insert(id.clone(), ValueNode::FunctionInvocationValue(inv));
                self.seen.insert(key, id.clone());
                Ok(ValueNode::ValueReference(id))
            }
            ValueNode::ArrayValue(arr) => {
                let values = arr
                    .values
                    .into_iter()
                    .map(|v| self.intern(v))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ValueNode::array(values))
            }
            ValueNode::DictionaryValue(dict) => {
                let mut values = BTreeMap::new();
                for (k, v) in dict.values {
                    values.insert(k, self.intern(v)?);
                }
                Ok(ValueNode::DictionaryValue(DictionaryValue { values }))
            }
            leaf => Ok(leaf),
        }
    }
}
