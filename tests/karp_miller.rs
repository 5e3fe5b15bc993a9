use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pn_cover::analysis::{
    CoverabilityBuilder, CoverabilityTree, NodeTag, TreeProperties, run,
};
use pn_cover::net::{Marking, Net, NetError, Tokens, Weight, load_net};

const NO_ARCS: [(&str, Weight); 0] = [];

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join(name)
}

/// Checks the structural guarantees every coverability tree must satisfy.
fn assert_well_formed(net: &Net, tree: &CoverabilityTree) {
    for (id, node) in tree.nodes() {
        let marking = node.marking();
        assert!(marking.covers(marking));

        let repeated = tree
            .ancestors(id)
            .any(|ancestor| tree.node(ancestor).marking() == marking);
        match node.tag() {
            NodeTag::Old => assert!(repeated, "{id} tagged old without a repeated ancestor"),
            NodeTag::DeadEnd => {
                assert!(!repeated);
                assert!(net.enabled_transitions(marking).is_empty());
            }
            NodeTag::Expanded => {
                assert!(!repeated);
                let enabled: Vec<_> = net
                    .enabled_transitions(marking)
                    .into_iter()
                    .map(|t| net.transitions()[t].name.clone())
                    .collect();
                let children: Vec<_> = node.children().keys().cloned().collect();
                assert_eq!(enabled, children);
            }
            NodeTag::New => assert!(!tree.is_complete()),
        }

        let (Some(parent), Some(transition)) = (node.parent(), node.transition()) else {
            assert_eq!(id, tree.root());
            continue;
        };
        let fired = net
            .fire_transition(tree.node(parent).marking(), transition)
            .unwrap();
        assert!(marking.covers(&fired));

        match node.acceleration() {
            Some(acceleration) => {
                assert!(tree.ancestors(id).any(|a| a == acceleration.ancestor));
                let covered = tree.node(acceleration.ancestor).marking();
                assert!(marking.covers(covered));
                assert_ne!(marking, covered);
                for place in &acceleration.promoted {
                    assert!(marking.tokens(*place).is_omega());
                    assert!(fired.tokens(*place) > covered.tokens(*place));
                    assert!(!fired.tokens(*place).is_omega());
                }
                for (place, tokens) in fired.iter() {
                    if !acceleration.promoted.contains(&place) {
                        assert_eq!(marking.tokens(place), tokens);
                    }
                }
            }
            None => assert_eq!(marking, &fired),
        }
    }
}

#[test]
fn producer_becomes_omega_and_repeats() {
    let net = load_net(demo("producer.json")).unwrap();
    let tree = run(&net);
    assert_well_formed(&net, &tree);

    let stats = tree.statistics();
    assert!(stats.has_omega);
    assert_eq!(stats.total_nodes, 3);
    assert_eq!(stats.old_nodes, 1);
    assert!(!TreeProperties::from_tree(&tree).is_bounded());
}

#[test]
fn bounded_cycle_stays_finite() {
    let net = load_net(demo("bounded_cycle.json")).unwrap();
    let tree = run(&net);
    assert_well_formed(&net, &tree);

    let stats = tree.statistics();
    assert!(!stats.has_omega);
    assert_eq!(stats.dead_end_nodes, 0);
    assert!(stats.old_nodes >= 1);
    assert!(TreeProperties::from_tree(&tree).is_bounded());
}

#[test]
fn growing_cycle_has_old_node_and_no_dead_end() {
    let net = load_net(demo("growing_cycle.json")).unwrap();
    let tree = run(&net);
    assert_well_formed(&net, &tree);
    let stats = tree.statistics();
    assert!(stats.old_nodes >= 1);
    assert_eq!(stats.dead_end_nodes, 0);
    assert!(stats.has_omega);
}

#[test]
fn dead_end_demo_is_single_node() {
    let net = load_net(demo("dead_end.json")).unwrap();
    let tree = run(&net);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.node(tree.root()).tag(), NodeTag::DeadEnd);
}

#[test]
fn mutex_never_enters_both_critical_sections() {
    let net = load_net(demo("mutex.ron")).unwrap();
    let tree = run(&net);
    assert_well_formed(&net, &tree);

    let crit_a = net.place_id("crit_a").unwrap();
    let crit_b = net.place_id("crit_b").unwrap();
    assert!(tree.nodes().all(|(_, node)| {
        let m = node.marking();
        !(m.tokens(crit_a) == 1u64 && m.tokens(crit_b) == 1u64)
    }));
    assert!(!tree.statistics().has_omega);
    assert!(TreeProperties::from_tree(&tree).dead_markings.is_empty());
}

#[test]
fn unknown_place_leaves_net_untouched() {
    let mut net = Net::new("strict");
    net.add_place("P0").unwrap();
    let before = net.to_definition();

    let err = net
        .add_transition("t", [("P0", 1)], [("Q", 1)])
        .unwrap_err();
    assert!(matches!(err, NetError::UnknownPlace { ref place, .. } if place == "Q"));
    assert_eq!(net.transitions_len(), 0);
    assert_eq!(net.to_definition(), before);

    assert!(net.set_initial_marking([("Q", 1)]).is_err());
    assert_eq!(net.initial_marking(), Marking::from_counts([0]));
}

#[test]
fn firing_does_not_touch_its_input() {
    let net = load_net(demo("bounded_cycle.json")).unwrap();
    let marking = net.initial_marking();
    let snapshot = marking.clone();
    let t1 = net.transition_id("t1").unwrap();

    let next = net.fire_transition(&marking, t1).unwrap();
    assert_eq!(marking, snapshot);
    assert_ne!(next, marking);
    assert!(net.fire_transition(&next, t1).is_err());
}

#[test]
fn omega_is_absorbing_under_firing() {
    let mut net = Net::new("omega");
    net.add_places(["P0"]).unwrap();
    net.add_transition("drain", [("P0", 5)], NO_ARCS).unwrap();

    let omega = Marking::new(vec![Tokens::Omega].into());
    let drain = net.transition_id("drain").unwrap();
    let next = net.fire_transition(&omega, drain).unwrap();
    assert_eq!(next, omega);
}

fn random_arcs<'a>(rng: &mut StdRng, names: &'a [String]) -> Vec<(&'a str, Weight)> {
    names
        .iter()
        .map(|name| (name.as_str(), rng.random_range(0..=3u64)))
        .collect()
}

fn random_net(rng: &mut StdRng) -> Net {
    let places = rng.random_range(1..=3);
    let names: Vec<String> = (0..places).map(|p| format!("p{p}")).collect();
    let mut net = Net::new("random");
    net.add_places(names.iter().cloned()).unwrap();
    net.set_initial_marking(
        names
            .iter()
            .map(|name| (name.as_str(), rng.random_range(0..=2u64))),
    )
    .unwrap();

    for t in 0..rng.random_range(1..=3) {
        let input = random_arcs(rng, &names);
        let output = random_arcs(rng, &names);
        net.add_transition(format!("t{t}"), input, output).unwrap();
    }
    net
}

#[test]
fn random_small_nets_terminate_with_sound_trees() {
    let mut rng = StdRng::seed_from_u64(0x5eed_cafe);
    for _ in 0..100 {
        let net = random_net(&mut rng);
        let tree = CoverabilityBuilder::new(&net)
            .with_node_limit(Some(200_000))
            .build();
        assert!(tree.len() <= 200_000);
        assert!(tree.is_complete(), "{net} did not finish");
        assert_well_formed(&net, &tree);
        assert_eq!(tree.statistics().new_nodes, 0);
    }
}
