use std::error::Error;
use std::fmt::{self, Debug, Display};

use crate::tool::{Tool, ToolHandle};

/// The name and description of a tool, used to render the instructions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolDescriptor {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
}

/// The model asked for an action that is not registered.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnknownAction {
    /// The requested action name.
    pub name: String,
}

impl Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action: {}", self.name)
    }
}

impl Error for UnknownAction {}

/// Maps action names to tools.
///
/// The registry is usually built once at startup and then shared read-only
/// by all sessions. Tools keep the order they were first registered in,
/// which is also the order they are presented to the model.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolHandle>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool, or replaces the tool bound to the same name.
    ///
    /// A replaced tool keeps its position and is returned.
    pub fn register<T: Tool>(&mut self, tool: T) -> Option<ToolHandle> {
        self.register_handle(ToolHandle::new(tool))
    }

    /// Same as [`ToolRegistry::register`], for an already wrapped tool.
    pub fn register_handle(&mut self, handle: ToolHandle) -> Option<ToolHandle> {
        match self.tools.iter_mut().find(|t| t.name() == handle.name()) {
            Some(slot) => {
                debug!("replacing tool: {}", handle.name());
                Some(std::mem::replace(slot, handle))
            }
            None => {
                self.tools.push(handle);
                None
            }
        }
    }

    /// Looks up the tool bound to `name`.
    pub fn resolve(&self, name: &str) -> Result<ToolHandle, UnknownAction> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| UnknownAction {
                name: name.to_owned(),
            })
    }

    /// Returns the descriptors of all tools, in registration order.
    pub fn describe_all(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
            })
            .collect()
    }

    /// Returns the names of all tools, in registration order.
    #[inline]
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(ToolHandle::name).collect()
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use super::*;
    use crate::tool::ToolResult;

    struct EchoTool {
        name: &'static str,
        prefix: &'static str,
    }

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Echoes its argument"
        }

        fn execute(
            &self,
            argument: String,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(format!("{}{argument}", self.prefix)))
        }
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());
        registry.register(EchoTool {
            name: "echo",
            prefix: "",
        });

        let tool = registry.resolve("echo").unwrap();
        assert_eq!(tool.execute("hello".to_owned()).await.unwrap(), "hello");

        let err = registry.resolve("traduzir").unwrap_err();
        assert_eq!(err.name, "traduzir");
        assert_eq!(err.to_string(), "unknown action: traduzir");
    }

    #[tokio::test]
    async fn test_replace_keeps_order() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool {
            name: "calcular",
            prefix: "",
        });
        registry.register(EchoTool {
            name: "wikipedia",
            prefix: "",
        });
        let replaced = registry.register(EchoTool {
            name: "calcular",
            prefix: "v2:",
        });

        assert!(replaced.is_some());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), ["calcular", "wikipedia"]);

        let tool = registry.resolve("calcular").unwrap();
        assert_eq!(tool.execute("1".to_owned()).await.unwrap(), "v2:1");

        let descriptors = registry.describe_all();
        assert_eq!(descriptors[1].name, "wikipedia");
        assert_eq!(descriptors[1].description, "Echoes its argument");
    }
}
