//! End-to-end checks through the real solver backend.

use std::io::Write;

use combopt_model::{GoodLpSolver, Solver};
use combopt_problems::{
    CapitalBudgetInstance, CrashingInstance, EdgeOrientation, FacilityInstance, Graph, GapRow, ProjectPair, TableFormat,
    TaskPath, build_capital_budget_model, build_crashing_model, build_facility_model, build_shortest_path_model,
    compare_relaxation, gap_row, read_graph, shortest_distances, write_gap_table,
};

const TOL: f64 = 1e-6;

/// Deterministic pseudo-random graph: `n` nodes, edges picked by a fixed stride.
fn scrambled_graph(n: usize, seed: usize) -> Graph {
    let weights: Vec<f64> = (0..n).map(|i| ((i * 7 + seed) % 5 + 1) as f64).collect();
    let mut edges = Vec::new();
    for i in 0..n {
        for j in 0..n {
            if i != j && (i * 31 + j * 17 + seed) % 4 == 0 {
                edges.push((i, j, ((i * 3 + j * 5 + seed) % 9) as f64));
            }
        }
    }
    Graph::from_weights(&weights, &edges).unwrap()
}

#[test]
fn shortest_path_dual_matches_dijkstra() {
    let solver = GoodLpSolver::new();
    for seed in 0..4 {
        let g = scrambled_graph(8, seed);
        for orientation in [EdgeOrientation::Directed, EdgeOrientation::Undirected] {
            let expected = shortest_distances(&g, 0, orientation);
            for dest in 1..g.num_nodes() {
                let sp = build_shortest_path_model(&g, 0, dest, orientation).unwrap();
                let result = solver.solve(&sp.model);
                match expected[dest] {
                    Some(d) => {
                        let got = sp.distance(&result).unwrap();
                        assert!(
                            (got - d).abs() < TOL,
                            "seed {} {:?} dest {}: LP {} vs Dijkstra {}",
                            seed,
                            orientation,
                            dest,
                            got,
                            d
                        );
                    }
                    None => assert!(!result.is_optimal(), "seed {} dest {} should be unreachable", seed, dest),
                }
            }
        }
    }
}

#[test]
fn dominating_set_gap_is_at_least_one() {
    let solver = GoodLpSolver::new();
    for seed in 0..5 {
        let g = scrambled_graph(7, seed);
        let gap = compare_relaxation(&g, &solver).unwrap();
        assert!(
            gap.ilp_objective >= gap.lp_objective - TOL,
            "seed {}: ILP {} below LP {}",
            seed,
            gap.ilp_objective,
            gap.lp_objective
        );
        assert!(gap.ratio.unwrap() >= 1.0 - TOL, "seed {}: ratio {:?}", seed, gap.ratio);
    }
}

#[test]
fn facility_plan_respects_gating_and_demand() {
    let instance = FacilityInstance {
        build_costs: vec![4.0, 2.0, 3.0],
        capacities: vec![80.0, 50.0, 60.0],
        demand: vec![40.0, 30.0, 20.0],
        unit_costs: vec![vec![1.0, 2.0, 3.0], vec![3.0, 1.0, 2.0], vec![2.0, 3.0, 1.0]],
        build_cost_scale: 1000.0,
    };
    let fm = build_facility_model(&instance).unwrap();
    let result = GoodLpSolver::new().solve(&fm.model);
    let plan = fm.extract(&result).unwrap();

    for (s, site) in plan.sites.iter().enumerate() {
        let output: f64 = site.production.iter().sum();
        if !site.open {
            assert!(output.abs() < TOL, "closed site {} produces {}", s, output);
        }
        assert!(output <= instance.capacities[s] + TOL);
    }
    for (p, &demand) in instance.demand.iter().enumerate() {
        let supplied: f64 = plan.sites.iter().map(|s| s.production[p]).sum();
        assert!((supplied - demand).abs() < TOL, "product {} supplied {} of {}", p, supplied, demand);
    }
}

#[test]
fn crashing_picks_one_mode_and_meets_deadlines() {
    let instance = CrashingInstance {
        normal_duration: vec![4.0, 6.0, 5.0, 3.0],
        fast_duration: vec![2.0, 3.0, 4.0, 1.0],
        normal_cost: vec![1.0, 1.0, 1.0, 1.0],
        fast_cost: vec![3.0, 4.0, 2.0, 5.0],
        paths: vec![
            TaskPath { tasks: vec![0, 1], deadline: 8.0 },
            TaskPath { tasks: vec![0, 2, 3], deadline: 9.0 },
        ],
    };
    let cm = build_crashing_model(&instance).unwrap();
    let result = GoodLpSolver::new().solve(&cm.model);
    assert!(result.is_optimal(), "status {}", result.status);

    for task in 0..4 {
        let chosen = result.value(cm.normal.at(task)).unwrap() + result.value(cm.fast.at(task)).unwrap();
        assert!((chosen - 1.0).abs() < TOL);
    }
    let schedule = cm.extract(&result).unwrap();
    for (path, duration) in instance.paths.iter().zip(&schedule.path_durations) {
        assert!(*duration <= path.deadline + TOL);
    }
}

#[test]
fn capital_budget_selection_is_consistent() {
    let mut instance = CapitalBudgetInstance::new(
        vec![40.0, 20.0, 20.0],
        vec![
            vec![-20.0, 5.0, 30.0],
            vec![-30.0, 10.0, 35.0],
            vec![-10.0, -10.0, 25.0],
            vec![-25.0, 15.0, 20.0],
            vec![-15.0, 5.0, 18.0],
        ],
    );
    instance.min_projects = 2;
    instance.max_projects = 3;
    instance.exclusive_pairs.push(ProjectPair { first: 0, second: 1 });
    instance.at_least_one_pairs.push(ProjectPair { first: 2, second: 3 });

    let cb = build_capital_budget_model(&instance).unwrap();
    let result = GoodLpSolver::new().solve(&cb.model);
    let plan = cb.extract(&result).unwrap();

    let count = plan.selected.iter().filter(|&&s| s).count();
    assert!((2..=3).contains(&count), "{} projects selected", count);
    assert!(!(plan.selected[0] && plan.selected[1]));
    assert!(plan.selected[2] || plan.selected[3]);
    for (p, (&selected, &fraction)) in plan.selected.iter().zip(&plan.fractions).enumerate() {
        if selected {
            assert!(fraction >= 0.1 - TOL, "project {} funded at {}", p, fraction);
        } else {
            assert!(fraction.abs() < TOL, "unselected project {} funded at {}", p, fraction);
        }
    }
    assert!(plan.capital.iter().all(|&c| c >= -TOL));
}

#[test]
fn batch_keeps_going_past_a_bad_instance() {
    let mut good = tempfile::NamedTempFile::new().unwrap();
    write!(good, "3\n3\n0\t1\n1\t1\n2\t1\n0\t1\n1\t2\n0\t2\n").unwrap();
    let mut bad = tempfile::NamedTempFile::new().unwrap();
    write!(bad, "3\n4\n0\t1\n1\t1\n2\t1\n0\t1\n").unwrap();

    let solver = GoodLpSolver::new();
    let rows: Vec<GapRow> = [("good", good.path()), ("bad", bad.path())]
        .into_iter()
        .map(|(name, path)| {
            let loaded = read_graph(path, Some('\t'))
                .map_err(|e| e.to_string())
                .and_then(|data| Graph::load(data).map_err(|e| e.to_string()));
            match loaded {
                Ok(graph) => gap_row(name, &graph, &solver),
                Err(reason) => GapRow {
                    instance: name.to_string(),
                    outcome: Err(reason),
                },
            }
        })
        .collect();

    let mut out = Vec::new();
    write_gap_table(&rows, &TableFormat::default(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("good;1;"), "row {}", lines[1]);
    assert!(lines[1].ends_with(";1"), "row {}", lines[1]);
    assert_eq!(lines[2], "bad;Declared 4 edges but found 1");
}
