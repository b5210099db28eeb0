use crate::error::GraphError;
use crate::graph::LinkGraph;

/// Growth regime of the admission controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Below the node budget: unseen targets become nodes.
    Growth,
    /// Budget reached: only edges between existing nodes are added.
    Saturation,
}

/// What happened to a single discovered link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The target became a new node and the edge was added.
    Created,
    /// The target already existed; the edge was added (or was already there).
    Linked,
    /// The target is unknown and the budget is spent.
    Dropped,
}

impl Admission {
    pub fn created_node(self) -> bool {
        matches!(self, Admission::Created)
    }
}

/// Decides, link by link, whether a discovered page may grow the graph.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionController {
    budget: usize,
}

impl AdmissionController {
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn phase(&self, graph: &LinkGraph) -> Phase {
        if graph.node_count() < self.budget {
            Phase::Growth
        } else {
            Phase::Saturation
        }
    }

    /// Applies the link `source -> target` to `graph`. The phase is read from
    /// the graph on every call, so it can flip halfway through a page.
    pub fn admit(
        &self,
        graph: &mut LinkGraph,
        source: &str,
        target: &str,
    ) -> Result<Admission, GraphError> {
        if !graph.has_node(source) {
            return Err(GraphError::UnknownNode(source.to_string()));
        }
        let admission = match self.phase(graph) {
            Phase::Growth => {
                if graph.add_node(target) {
                    Admission::Created
                } else {
                    Admission::Linked
                }
            }
            Phase::Saturation if graph.has_node(target) => Admission::Linked,
            Phase::Saturation => return Ok(Admission::Dropped),
        };
        graph.add_edge(source, target)?;
        Ok(admission)
    }
}
