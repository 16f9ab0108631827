mod util;

use mesh_ghosting::coordinator::{GhostingConfig, ManagerState};
use mesh_ghosting::ghosting::{GhostingClass, TargetSystem};
use mesh_ghosting::mesh_error::GhostingError;
use util::*;

fn with_system(rank: usize) -> mesh_ghosting::coordinator::AttachmentCoordinator {
    let mut c = interval_coordinator(rank, no_defaults());
    c.add_system("u", 1).unwrap();
    c
}

fn send_list(c: &mesh_ghosting::coordinator::AttachmentCoordinator) -> Vec<u64> {
    c.system(TargetSystem::Undisplaced, "u")
        .unwrap()
        .dof_map()
        .send_list()
        .to_vec()
}

fn rederivations(c: &mesh_ghosting::coordinator::AttachmentCoordinator) -> usize {
    c.system(TargetSystem::Undisplaced, "u")
        .unwrap()
        .n_rederivations()
}

#[test]
fn early_algebraic_needs_no_rederivation() {
    let mut c = with_system(0);
    c.register(&side_layers(GhostingClass::ALGEBRAIC, 1)).unwrap();
    c.init_dof_maps().unwrap();
    assert_eq!(send_list(&c), vec![5]);
    assert_eq!(rederivations(&c), 0);
    assert_eq!(c.stats().forced_rederivations, 0);
}

#[test]
fn late_algebraic_forces_exactly_one_rederivation() {
    let mut c = with_system(0);
    c.register(&side_layers(GhostingClass::ALGEBRAIC, 1)).unwrap();
    c.init_dof_maps().unwrap();
    let rm = accepted(c.register(&side_layers(GhostingClass::ALGEBRAIC, 2)).unwrap());
    assert_eq!(send_list(&c), vec![5, 6]);
    assert_eq!(rederivations(&c), 1);
    assert_eq!(c.stats().forced_rederivations, 1);
    assert_eq!(c.manager_state(rm.name()), Some(ManagerState::Active));
}

#[test]
fn late_mixed_manager_rederives_once() {
    let mut c = with_system(0);
    c.init_dof_maps().unwrap();
    c.delete_remote_elements().unwrap();
    c.register(&side_layers(GhostingClass::GEOMETRIC | GhostingClass::ALGEBRAIC, 2))
        .unwrap();
    assert_eq!(rederivations(&c), 1);
    assert_eq!(c.stats().forced_rederivations, 1);
    assert_eq!(c.stats().late_geometric, 1);
}

#[test]
fn redundant_late_request_changes_nothing() {
    let mut c = with_system(0);
    c.register(&side_layers(GhostingClass::ALGEBRAIC, 2)).unwrap();
    c.init_dof_maps().unwrap();
    c.register(&side_layers(GhostingClass::ALGEBRAIC, 1)).unwrap();
    assert_eq!(rederivations(&c), 0);
}

#[test]
fn deletion_keeps_default_ghosting() {
    let mut c = interval_coordinator(0, GhostingConfig::default());
    let removed = c.delete_remote_elements().unwrap();
    assert_eq!(removed, 4);
    let mesh = c.mesh(TargetSystem::Undisplaced).unwrap();
    let resident: Vec<u64> = mesh.elements().map(|e| e.id.get()).collect();
    assert_eq!(resident, vec![0, 1, 2, 3, 4, 5]);
    assert!(c.remote_elements_deleted());
}

#[test]
fn late_geometric_regathers_and_suppresses_deletion() {
    let mut c = interval_coordinator(0, no_defaults());
    c.register(&side_layers(GhostingClass::GEOMETRIC, 1)).unwrap();
    c.delete_remote_elements().unwrap();
    assert_eq!(c.mesh(TargetSystem::Undisplaced).unwrap().n_elem(), 6);

    c.register(&side_layers(GhostingClass::GEOMETRIC, 3)).unwrap();
    let mesh = c.mesh(TargetSystem::Undisplaced).unwrap();
    assert_eq!(mesh.n_elem(), 10);
    assert!(!mesh.is_remote_element_removal_allowed());
    assert_eq!(c.stats().late_geometric, 1);
    assert_eq!(c.stats().forced_rederivations, 0);
    assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 0), ids(&[5, 6, 7]));

    assert_eq!(c.delete_remote_elements().unwrap(), 0);
    assert_eq!(c.mesh(TargetSystem::Undisplaced).unwrap().n_elem(), 10);
}

#[test]
fn late_geometric_with_dofs_rederives() {
    let mut c = with_system(0);
    c.init_dof_maps().unwrap();
    c.delete_remote_elements().unwrap();
    c.register(&point_layers(GhostingClass::GEOMETRIC, 1)).unwrap();
    assert_eq!(c.stats().forced_rederivations, 1);
    assert_eq!(rederivations(&c), 1);
}

#[test]
fn geometric_after_dof_maps_rederives_without_deletion() {
    let mut c = with_system(0);
    c.init_dof_maps().unwrap();
    c.register(&point_layers(GhostingClass::GEOMETRIC, 2)).unwrap();
    assert_eq!(c.stats().forced_rederivations, 1);
    assert_eq!(rederivations(&c), 1);
    assert_eq!(c.stats().late_geometric, 0);
    assert_eq!(c.mesh(TargetSystem::Undisplaced).unwrap().n_elem(), 10);
}

#[test]
fn deferred_geometric_after_dof_maps_rederives_at_finalization() {
    let mut c = with_system(0);
    c.init_dof_maps().unwrap();
    c.register(&side_layers(GhostingClass::GEOMETRIC, 2).deferred())
        .unwrap();
    assert_eq!(rederivations(&c), 0);
    c.finalize_geometric().unwrap();
    assert_eq!(c.stats().forced_rederivations, 1);
    assert_eq!(rederivations(&c), 1);
    c.finalize_geometric().unwrap();
    assert_eq!(rederivations(&c), 1);
}

#[test]
fn deferred_manager_binds_at_finalization() {
    let mut c = interval_coordinator(0, no_defaults());
    let rm = accepted(
        c.register(&side_layers(GhostingClass::GEOMETRIC, 2).deferred())
            .unwrap(),
    );
    assert_eq!(c.manager_state(rm.name()), Some(ManagerState::Accepted));
    assert!(ghosts(&c, GhostingClass::GEOMETRIC, 0).is_empty());

    c.finalize_geometric().unwrap();
    assert_eq!(c.manager_state(rm.name()), Some(ManagerState::Active));
    assert!(
        c.mesh(TargetSystem::Undisplaced)
            .unwrap()
            .is_remote_element_removal_allowed()
    );
    c.delete_remote_elements().unwrap();
    assert_eq!(c.mesh(TargetSystem::Undisplaced).unwrap().n_elem(), 7);
}

#[test]
fn ghosted_element_is_regathered() {
    let mut c = interval_coordinator(0, GhostingConfig::default());
    c.delete_remote_elements().unwrap();
    assert!(!c.mesh(TargetSystem::Undisplaced).unwrap().contains(eid(8)));

    c.add_ghosted_elem(eid(8)).unwrap();
    assert!(c.mesh(TargetSystem::Undisplaced).unwrap().contains(eid(8)));
    assert!(ghosts(&c, GhostingClass::GEOMETRIC, 0).contains(&eid(8)));
}

#[test]
fn ghosted_boundary_is_checked_once_prepared() {
    let mut c = interval_coordinator(1, no_defaults());
    let err = c.add_ghosted_boundary("nowhere").unwrap_err();
    assert!(matches!(err, GhostingError::UnknownBoundary(_)));
    c.add_ghosted_boundary("boundary_x_min").unwrap();
    assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 1), ids(&[0]));
}

#[test]
fn dof_maps_initialize_once() {
    let mut c = with_system(0);
    c.init_dof_maps().unwrap();
    assert!(matches!(
        c.init_dof_maps(),
        Err(GhostingError::InvalidPhase { .. })
    ));
    assert!(c.add_system("v", 1).is_err());
}
