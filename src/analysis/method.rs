//! Decoded method bodies and the supplier trait the analysis layer consumes.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::{
    analysis::{AnalysisConfig, ControlFlowGraph},
    assembly::{HandlerRange, Instruction, MethodIdentifier, VariableTable},
    Result,
};

/// Everything the analysis needs to know about one method.
///
/// A body is produced by a decoder or by [`crate::assembly::MethodAssembler`] and is not
/// modified afterwards.
#[derive(Debug, Clone)]
pub struct MethodBody {
    method: Arc<MethodIdentifier>,
    instructions: Vec<Arc<Instruction>>,
    handlers: Vec<HandlerRange>,
    variables: VariableTable,
}

impl MethodBody {
    /// Creates a body from its parts.
    #[must_use]
    pub fn new(
        method: Arc<MethodIdentifier>,
        instructions: Vec<Arc<Instruction>>,
        handlers: Vec<HandlerRange>,
        variables: VariableTable,
    ) -> Self {
        MethodBody {
            method,
            instructions,
            handlers,
            variables,
        }
    }

    /// The owning method.
    #[must_use]
    pub fn method(&self) -> &Arc<MethodIdentifier> {
        &self.method
    }

    /// Instructions in stream order.
    #[must_use]
    pub fn instructions(&self) -> &[Arc<Instruction>] {
        &self.instructions
    }

    /// Exception handler ranges in declaration order.
    #[must_use]
    pub fn handlers(&self) -> &[HandlerRange] {
        &self.handlers
    }

    /// The local variable table.
    #[must_use]
    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Returns the instruction at `order`.
    #[must_use]
    pub fn instruction(&self, order: i32) -> Option<&Arc<Instruction>> {
        usize::try_from(order)
            .ok()
            .and_then(|index| self.instructions.get(index))
            .filter(|instruction| instruction.order() == order)
    }

    /// Builds the control-flow graph of this body.
    ///
    /// # Errors
    ///
    /// See [`ControlFlowGraph::compute_with`].
    pub fn analyze(&self, config: &AnalysisConfig) -> Result<ControlFlowGraph> {
        ControlFlowGraph::for_method(self.method.clone(), &self.instructions, &self.handlers, config)
    }
}

/// Supplies decoded method bodies by method identifier.
///
/// Implemented by whatever owns the decoded class files; the analysis layer only reads
/// from it.
pub trait InstructionSource: Sync {
    /// Returns the body of `method`, or `None` if the method is unknown or abstract.
    fn method_body(&self, method: &MethodIdentifier) -> Option<&MethodBody>;

    /// Returns every method this source can supply, in a stable order.
    fn methods(&self) -> Vec<&MethodIdentifier>;
}

impl InstructionSource for HashMap<MethodIdentifier, MethodBody> {
    fn method_body(&self, method: &MethodIdentifier) -> Option<&MethodBody> {
        self.get(method)
    }

    fn methods(&self) -> Vec<&MethodIdentifier> {
        let mut methods: Vec<&MethodIdentifier> = self.keys().collect();
        methods.sort();
        methods
    }
}

impl InstructionSource for BTreeMap<MethodIdentifier, MethodBody> {
    fn method_body(&self, method: &MethodIdentifier) -> Option<&MethodBody> {
        self.get(method)
    }

    fn methods(&self) -> Vec<&MethodIdentifier> {
        self.keys().collect()
    }
}

impl InstructionSource for [MethodBody] {
    fn method_body(&self, method: &MethodIdentifier) -> Option<&MethodBody> {
        self.iter().find(|body| body.method.as_ref() == method)
    }

    fn methods(&self) -> Vec<&MethodIdentifier> {
        self.iter().map(|body| body.method.as_ref()).collect()
    }
}

impl InstructionSource for Vec<MethodBody> {
    fn method_body(&self, method: &MethodIdentifier) -> Option<&MethodBody> {
        self.as_slice().method_body(method)
    }

    fn methods(&self) -> Vec<&MethodIdentifier> {
        self.as_slice().methods()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{MethodAssembler, Operation};

    fn body(name: &str) -> MethodBody {
        let method = MethodIdentifier::new("com/example/Foo", name, "()V").unwrap();
        let mut asm = MethodAssembler::new(method);
        asm.emit(Operation::Nop).unwrap();
        asm.emit(Operation::Return(None)).unwrap();
        asm.finish().unwrap()
    }

    #[test]
    fn test_instruction_lookup() {
        let body = body("run");
        assert_eq!(body.instruction(1).map(|i| i.order()), Some(1));
        assert!(body.instruction(2).is_none());
        assert!(body.instruction(-1).is_none());
    }

    #[test]
    fn test_sources_agree() {
        let bodies = vec![body("b"), body("a")];
        let map: HashMap<MethodIdentifier, MethodBody> = bodies
            .iter()
            .map(|b| (b.method().as_ref().clone(), b.clone()))
            .collect();

        let names: Vec<&str> = map.methods().iter().map(|m| m.method_name()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let wanted = bodies[1].method().as_ref().clone();
        assert!(map.method_body(&wanted).is_some());
        assert!(bodies.method_body(&wanted).is_some());
        assert_eq!(bodies.methods().len(), 2);
    }

    #[test]
    fn test_analyze() {
        let cfg = body("run").analyze(&AnalysisConfig::default()).unwrap();
        // two instructions plus both sentinels
        assert_eq!(cfg.node_count(), 4);
    }
}
