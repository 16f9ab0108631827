mod util;

use mesh_ghosting::coordinator::{Admission, ManagerState, RelationshipManagerParams};
use mesh_ghosting::ghosting::{
    AdjacencyRule, GhostSet, GhostingClass, GhostingRule, QueryContext, RelationshipDescriptor,
    RelationshipManager,
};
use mesh_ghosting::mesh_error::GhostingError;
use mesh_ghosting::topology::point::ElemId;
use std::any::Any;
use std::sync::Arc;
use util::*;

#[test]
fn redundant_request_is_rejected_and_tagged() {
    let mut c = interval_coordinator(0, no_defaults());
    let deep = accepted(
        c.register(&side_layers(GhostingClass::GEOMETRIC, 2).for_whom("contact"))
            .unwrap(),
    );
    let before = ghosts(&c, GhostingClass::GEOMETRIC, 0);

    let shallow = c
        .register(&side_layers(GhostingClass::GEOMETRIC, 1).for_whom("kernel"))
        .unwrap();
    let Admission::Subsumed { by, candidate } = shallow else {
        panic!("shallow request should be subsumed");
    };
    assert_eq!(by.name(), deep.name());
    assert_eq!(deep.descriptor().for_whom(), vec!["contact", "kernel"]);
    assert_eq!(c.manager_state(&candidate), Some(ManagerState::RejectedAsRedundant));
    assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 0), before);
    assert_eq!(c.stats().subsumed, 1);
    assert_eq!(c.factory().released(), 1);
}

#[test]
fn different_class_or_kind_is_never_redundant() {
    let mut c = interval_coordinator(0, no_defaults());
    accepted(c.register(&side_layers(GhostingClass::GEOMETRIC, 3)).unwrap());
    accepted(c.register(&side_layers(GhostingClass::ALGEBRAIC, 1)).unwrap());
    accepted(c.register(&point_layers(GhostingClass::GEOMETRIC, 1)).unwrap());
    assert_eq!(c.managers().count(), 3);
}

#[test]
fn registration_never_shrinks_ghosting() {
    let mut c = interval_coordinator(0, no_defaults());
    let mut prev = ghosts(&c, GhostingClass::GEOMETRIC, 0);
    for depth in [1, 3, 2, 1, 4] {
        c.register(&side_layers(GhostingClass::GEOMETRIC, depth)).unwrap();
        let now = ghosts(&c, GhostingClass::GEOMETRIC, 0);
        assert!(now.is_superset(&prev), "depth {depth}: {now:?} lost part of {prev:?}");
        prev = now;
    }
    assert_eq!(prev, ids(&[5, 6, 7, 8]));
}

#[test]
fn proxies_never_subsume() {
    let mut c = interval_coordinator(0, no_defaults());
    c.enable_displaced(100).unwrap();
    let proxy = RelationshipManagerParams::new("ProxyRelationshipManager", GhostingClass::GEOMETRIC);
    accepted(c.register(&proxy).unwrap());
    accepted(c.register(&proxy).unwrap());
}

#[derive(Debug)]
struct EveryOther;

impl GhostingRule for EveryOther {
    fn family(&self) -> &str {
        "every_other"
    }

    fn coupled_elements(
        &self,
        ctx: &QueryContext<'_>,
        _range: &[ElemId],
        out: &mut GhostSet,
    ) -> Result<(), GhostingError> {
        for e in ctx.mesh.active_elements().filter(|e| e.id.get() % 2 == 0) {
            out.insert_full(e.id);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn plugin() -> RelationshipManager {
    RelationshipManager::new(
        RelationshipDescriptor::new("EveryOther", GhostingClass::GEOMETRIC),
        AdjacencyRule::Plugin(Arc::new(EveryOther)),
    )
}

#[test]
fn plugin_without_comparison_fails_registration() {
    let mut c = interval_coordinator(0, no_defaults());
    let first = accepted(c.register_manager(plugin()).unwrap());
    assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 0), ids(&[6, 8]));

    let err = c.register_manager(plugin()).unwrap_err();
    assert!(matches!(
        err,
        GhostingError::NotImplemented { operation: "covers", .. }
    ));
    assert_eq!(c.managers().count(), 1);
    assert_eq!(c.manager(first.name()).map(|rm| rm.name()), Some(first.name()));
}

#[test]
fn plugin_type_can_be_registered_by_name() {
    let mut c = interval_coordinator(0, no_defaults());
    c.factory_mut().register_type(
        "EveryOther",
        Box::new(|_| Ok(AdjacencyRule::Plugin(Arc::new(EveryOther)))),
    );
    let rm = accepted(
        c.register(&RelationshipManagerParams::new("EveryOther", GhostingClass::GEOMETRIC))
            .unwrap(),
    );
    assert_eq!(rm.rule().family(), "every_other");
}
