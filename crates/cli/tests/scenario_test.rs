//! Replays the bundled scenarios end to end.

use std::collections::BTreeSet;
use std::path::PathBuf;

use cli::scenario::{self, StepOutcome};
use corelib::{Lifecycle, NodeId, Token};
use seeding::{Attribute, TokenAssignment};

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(name)
}

#[test]
fn test_two_datacenter_fabric() {
    let scenario = scenario::load(&bundled("two_datacenters.json")).unwrap();
    let report = scenario::run(scenario).unwrap();

    let fabric = report.fabric.as_ref().unwrap();
    let seeds: BTreeSet<NodeId> = [NodeId(1), NodeId(3)].into_iter().collect();
    assert_eq!(fabric.quorum_size, 2);
    assert_eq!(fabric.current_seeds, seeds);
    assert_eq!(fabric.lifecycle, Lifecycle::Running);
    for dc in &report.datacenters {
        assert_eq!(dc.current_seeds, seeds, "datacenter {}", dc.name);
    }

    assert_eq!(report.outcomes.len(), 3);
    match &report.outcomes[1] {
        StepOutcome::Grow { datacenter, assignments } => {
            assert_eq!(datacenter, "west");
            assert_eq!(assignments, &vec![TokenAssignment::Vnodes(256)]);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    match &report.outcomes[2] {
        StepOutcome::Replace { tokens, .. } => {
            assert_eq!(tokens, &Some([Token::from(-1i64)].into_iter().collect()));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let east = &report.datacenters[0];
    assert_eq!(east.endpoint.cluster_nodes, vec!["east-1:9160".to_string()]);
    assert!(report.attributes.iter().any(|change| change.source == "global"
        && change.attribute == Attribute::HasPublishedSeeds(true)));
}

#[test]
fn test_missing_scenario_file() {
    assert!(scenario::load(&bundled("missing.json")).is_err());
}
