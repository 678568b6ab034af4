use stepwise::config::{RawWorkflowDefinition, StepDefinition, WorkflowDefinition};

/// Builder for `WorkflowDefinition` to simplify test setup.
pub struct DefinitionBuilder {
    definition: RawWorkflowDefinition,
}

impl DefinitionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            definition: RawWorkflowDefinition {
                name: name.to_string(),
                steps: Vec::new(),
            },
        }
    }

    pub fn step(mut self, step_number: u32, task_type: &str) -> Self {
        self.definition.steps.push(StepBuilder::new(step_number, task_type).build());
        self
    }

    pub fn step_after(mut self, step_number: u32, task_type: &str, depends_on: u32) -> Self {
        self.definition.steps.push(
            StepBuilder::new(step_number, task_type)
                .depends_on(depends_on)
                .build(),
        );
        self
    }

    pub fn with_step(mut self, step: StepDefinition) -> Self {
        self.definition.steps.push(step);
        self
    }

    /// The unvalidated document, for tests that exercise validation.
    pub fn build_raw(self) -> RawWorkflowDefinition {
        self.definition
    }

    pub fn build(self) -> WorkflowDefinition {
        WorkflowDefinition::try_from(self.definition)
            .expect("Failed to build valid definition from builder")
    }
}

/// Builder for `StepDefinition`.
pub struct StepBuilder {
    step: StepDefinition,
}

impl StepBuilder {
    pub fn new(step_number: u32, task_type: &str) -> Self {
        Self {
            step: StepDefinition {
                task_type: task_type.to_string(),
                step_number,
                depends_on: None,
            },
        }
    }

    pub fn depends_on(mut self, step_number: u32) -> Self {
        self.step.depends_on = Some(step_number);
        self
    }

    pub fn build(self) -> StepDefinition {
        self.step
    }
}

/// The three-step chain used throughout the tests:
/// `polygonArea` -> `notification` -> `reportGeneration`.
pub fn three_step_chain() -> WorkflowDefinition {
    DefinitionBuilder::new("three-step-chain")
        .step(1, "polygonArea")
        .step_after(2, "notification", 1)
        .step_after(3, "reportGeneration", 2)
        .build()
}
