//! Effectiveness of model objects.
//!
//! Some ports are present in the model without carrying any data: ports linked
//! to nothing, and state machine outputs that no transition ever writes. Their
//! terms are marked ineffective so that they neither constrain nor get
//! constrained.
use std::collections::BTreeSet;

use hymodel::model::{EntityKind, Model, ModelObject, PortId};
use log::debug;

use crate::utils::error::PropResult;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effectiveness {
    ineffective: BTreeSet<PortId>,
}

impl Effectiveness {
    /// Derive effectiveness from connectivity and state machine actions.
    pub fn compute(model: &Model) -> PropResult<Self> {
        let mut ineffective: BTreeSet<PortId> = model
            .ports()
            .filter(|(id, _)| !model.is_connected(*id))
            .map(|(id, _)| id)
            .collect();

        for (entity_id, entity) in model.entities() {
            let EntityKind::Fsm(body) = &entity.kind else {
                continue;
            };

            let mut written: BTreeSet<String> = BTreeSet::new();
            for (_, transition) in body.transitions() {
                for action in transition.parse_output_actions()? {
                    written.insert(action.target);
                }
            }

            for port in entity.ports.iter() {
                let p = model.port(*port);
                if p.is_output() && !written.contains(&p.name) {
                    debug!(
                        "Output `{}` of state machine `{}` is never written",
                        p.name,
                        model.full_name(entity_id)
                    );
                    ineffective.insert(*port);
                }
            }
        }

        Ok(Self { ineffective })
    }

    pub fn is_effective(&self, object: ModelObject) -> bool {
        match object {
            ModelObject::Port(port) => !self.ineffective.contains(&port),
            ModelObject::Attribute(_) => true,
        }
    }

    pub fn ineffective_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.ineffective.iter().copied()
    }
}
