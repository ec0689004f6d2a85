//! Consumption propagation across the location graph

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::models::Location;

/// One consumer's draw on one production record: (location index, record index, amount)
type Contribution = (usize, usize, f64);

/// Recompute `production[*].consumption` for every location in place.
///
/// Each location's declared consumption is charged against the matching production
/// records of every location it lists in `resource_sources`, one hop only, once per
/// listed edge. Dangling ids and unmatched resources contribute nothing.
pub fn recompute_consumption(locations: &mut [Location]) {
    for location in locations.iter_mut() {
        for record in &mut location.production {
            record.consumption = 0.0;
        }
    }

    let contributions = collect_contributions(locations);
    debug!(
        locations = locations.len(),
        contributions = contributions.len(),
        "recomputed consumption"
    );

    for (loc_idx, rec_idx, amount) in contributions {
        locations[loc_idx].production[rec_idx].consumption += amount;
    }
}

/// Value-style variant of [`recompute_consumption`]
pub fn recompute(mut locations: Vec<Location>) -> Vec<Location> {
    recompute_consumption(&mut locations);
    locations
}

fn collect_contributions(locations: &[Location]) -> Vec<Contribution> {
    // First location with a given id that produces anything
    let mut producers: HashMap<&str, usize> = HashMap::new();
    for (idx, location) in locations.iter().enumerate() {
        if !location.production.is_empty() {
            producers.entry(location.id.as_str()).or_insert(idx);
        }
    }

    let mut contributions = Vec::new();
    for consumer in locations {
        if consumer.resource_sources.is_empty() || consumer.consumption.is_empty() {
            continue;
        }

        // Repeated class names: last declaration wins
        let demand: HashMap<&str, f64> = consumer
            .consumption
            .iter()
            .map(|c| (c.resource.class_name.as_str(), c.amount))
            .collect();

        for source_id in &consumer.resource_sources {
            let Some(&source_idx) = producers.get(source_id.as_str()) else {
                debug!(consumer = %consumer.id, source = %source_id, "skipping source with no production");
                continue;
            };

            for (rec_idx, record) in locations[source_idx].production.iter().enumerate() {
                if let Some(&amount) = demand.get(record.resource.class_name.as_str()) {
                    contributions.push((source_idx, rec_idx, amount));
                }
            }
        }
    }

    contributions
}

/// Balance of one production record after propagation
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBalance {
    pub class_name: String,
    pub display_name: String,
    pub produced: f64,
    pub consumed: f64,
}

impl OutputBalance {
    pub fn surplus(&self) -> f64 {
        self.produced - self.consumed
    }

    pub fn over_drawn(&self) -> bool {
        self.consumed > self.produced
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationBalance {
    pub id: String,
    pub name: String,
    pub outputs: Vec<OutputBalance>,
}

/// Plan-wide figures for one resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTotal {
    pub produced: f64,
    /// Drawn from producers through source links
    pub consumed: f64,
    /// Declared by consumers, whether or not a linked producer supplies it
    pub demanded: f64,
}

/// Summary of a propagated plan
#[derive(Debug)]
pub struct PlanSummary {
    pub locations: Vec<LocationBalance>,
    pub totals: Vec<(String, ResourceTotal)>,
}

impl PlanSummary {
    pub fn over_drawn(&self) -> impl Iterator<Item = (&LocationBalance, &OutputBalance)> {
        self.locations
            .iter()
            .flat_map(|l| l.outputs.iter().map(move |o| (l, o)))
            .filter(|(_, o)| o.over_drawn())
    }
}

/// Summarize an already propagated collection
pub fn summarize(locations: &[Location]) -> PlanSummary {
    let mut totals: BTreeMap<String, ResourceTotal> = BTreeMap::new();
    let mut balances = Vec::with_capacity(locations.len());

    for location in locations {
        let mut outputs = Vec::with_capacity(location.production.len());
        for record in &location.production {
            let total = totals.entry(record.resource.class_name.clone()).or_default();
            total.produced += record.amount;
            total.consumed += record.consumption;

            outputs.push(OutputBalance {
                class_name: record.resource.class_name.clone(),
                display_name: record.resource.display_name.clone(),
                produced: record.amount,
                consumed: record.consumption,
            });
        }

        for record in &location.consumption {
            totals
                .entry(record.resource.class_name.clone())
                .or_default()
                .demanded += record.amount;
        }

        balances.push(LocationBalance {
            id: location.id.clone(),
            name: location.name.clone(),
            outputs,
        });
    }

    PlanSummary {
        locations: balances,
        totals: totals.into_iter().collect(),
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Plan Summary ===")?;

        for location in &self.locations {
            writeln!(f, "{} ({})", location.name, location.id)?;
            if location.outputs.is_empty() {
                writeln!(f, "  no production")?;
            }
            for output in &location.outputs {
                let label = if output.display_name.is_empty() {
                    &output.class_name
                } else {
                    &output.display_name
                };
                writeln!(
                    f,
                    "  {:<30} {:>9.2} /min produced {:>9.2} used {:>9.2} spare{}",
                    label,
                    output.produced,
                    output.consumed,
                    output.surplus(),
                    if output.over_drawn() { "  OVER" } else { "" }
                )?;
            }
        }
        writeln!(f)?;

        writeln!(f, "Totals:")?;
        for (class_name, total) in &self.totals {
            writeln!(
                f,
                "  {:<30} {:>9.2} produced {:>9.2} used {:>9.2} demanded",
                class_name, total.produced, total.consumed, total.demanded
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resource;
    use proptest::prelude::*;

    fn res(class_name: &str) -> Resource {
        Resource::bare(class_name)
    }

    fn consumption_of(locations: &[Location], id: &str, class_name: &str) -> f64 {
        locations
            .iter()
            .find(|l| l.id == id)
            .and_then(|l| l.production_of(class_name))
            .map(|p| p.consumption)
            .unwrap()
    }

    #[test]
    fn direct_aggregation() {
        let mut locations = vec![
            Location::new("p", "Producer").produces(res("r"), 200.0),
            Location::new("c", "Consumer")
                .with_source("p")
                .consumes(res("r"), 240.0),
        ];
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "p", "r"), 240.0);
    }

    #[test]
    fn idempotent_without_edits() {
        let mut locations = vec![
            Location::new("p", "Producer").produces(res("r"), 200.0),
            Location::new("c", "Consumer")
                .with_source("p")
                .consumes(res("r"), 75.0),
        ];
        recompute_consumption(&mut locations);
        let first = locations.clone();
        recompute_consumption(&mut locations);
        assert_eq!(first, locations);
    }

    #[test]
    fn reset_clears_stale_values() {
        let mut locations = vec![
            Location::new("a", "A").produces(res("r"), 10.0),
            Location::new("b", "B")
                .produces(res("s"), 10.0)
                .consumes(res("r"), 5.0),
        ];
        for location in &mut locations {
            for record in &mut location.production {
                record.consumption = 999.0;
            }
        }
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "a", "r"), 0.0);
        assert_eq!(consumption_of(&locations, "b", "s"), 0.0);
    }

    #[test]
    fn dangling_source_contributes_nothing() {
        let mut locations = vec![
            Location::new("p", "Producer").produces(res("r"), 50.0),
            Location::new("c", "Consumer")
                .with_source("missing")
                .consumes(res("r"), 20.0),
        ];
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "p", "r"), 0.0);
    }

    #[test]
    fn source_without_production_is_skipped() {
        let mut locations = vec![
            Location::new("empty", "Empty"),
            Location::new("c", "Consumer")
                .with_source("empty")
                .consumes(res("r"), 20.0),
        ];
        let before = locations.clone();
        recompute_consumption(&mut locations);
        assert_eq!(before, locations);
    }

    #[test]
    fn cycle_converges() {
        let mut locations = vec![
            Location::new("a", "A")
                .with_source("b")
                .consumes(res("x"), 30.0)
                .produces(res("y"), 40.0),
            Location::new("b", "B")
                .with_source("a")
                .consumes(res("y"), 60.0)
                .produces(res("x"), 70.0),
        ];
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "a", "y"), 60.0);
        assert_eq!(consumption_of(&locations, "b", "x"), 30.0);
    }

    #[test]
    fn self_source_counts_once_per_edge() {
        let mut locations = vec![
            Location::new("a", "Loop")
                .with_source("a")
                .consumes(res("x"), 4.0)
                .produces(res("x"), 10.0),
        ];
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "a", "x"), 4.0);
    }

    #[test]
    fn matches_by_class_name_not_instance() {
        let mut locations = vec![
            Location::new("p", "Quarry")
                .produces(Resource::new("desc-silica-c", "Silica", "Refined quartz"), 100.0),
            Location::new("c", "Assembler")
                .with_source("p")
                .consumes(Resource::bare("desc-silica-c"), 37.5),
        ];
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "p", "desc-silica-c"), 37.5);
    }

    #[test]
    fn multi_resource_selective_matching() {
        let mut locations = vec![
            Location::new("p", "Producer")
                .produces(res("r1"), 100.0)
                .produces(res("r2"), 150.0),
            Location::new("c", "Consumer")
                .with_source("p")
                .consumes(res("r1"), 80.0)
                .consumes(res("r2"), 120.0)
                .consumes(res("r3"), 50.0),
        ];
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "p", "r1"), 80.0);
        assert_eq!(consumption_of(&locations, "p", "r2"), 120.0);
        assert!(locations[0].production_of("r3").is_none());
    }

    #[test]
    fn duplicate_edges_and_consumers_accumulate() {
        let mut locations = vec![
            Location::new("p", "Producer").produces(res("r"), 100.0),
            Location::new("c1", "First")
                .with_source("p")
                .with_source("p")
                .consumes(res("r"), 10.0),
            Location::new("c2", "Second")
                .with_source("p")
                .consumes(res("r"), 25.0),
        ];
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "p", "r"), 45.0);
    }

    #[test]
    fn repeated_class_name_keeps_last_declaration() {
        let mut locations = vec![
            Location::new("p", "Producer").produces(res("r"), 100.0),
            Location::new("c", "Consumer")
                .with_source("p")
                .consumes(res("r"), 10.0)
                .consumes(res("r"), 35.0),
        ];
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "p", "r"), 35.0);
    }

    #[test]
    fn duplicate_ids_resolve_to_first_producer() {
        let mut locations = vec![
            Location::new("dup", "No output"),
            Location::new("dup", "First").produces(res("r"), 10.0),
            Location::new("dup", "Second").produces(res("r"), 10.0),
            Location::new("c", "Consumer")
                .with_source("dup")
                .consumes(res("r"), 3.0),
        ];
        recompute_consumption(&mut locations);
        assert_eq!(locations[1].production[0].consumption, 3.0);
        assert_eq!(locations[2].production[0].consumption, 0.0);
    }

    #[test]
    fn removing_and_restoring_an_edge() {
        let mut locations = vec![
            Location::new("p", "Producer").produces(res("r"), 200.0),
            Location::new("c", "Consumer")
                .with_source("p")
                .consumes(res("r"), 240.0),
        ];
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "p", "r"), 240.0);

        locations[1].resource_sources.clear();
        locations[1].consumption.clear();
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "p", "r"), 0.0);

        locations[1] = Location::new("c", "Consumer")
            .with_source("p")
            .consumes(res("r"), 240.0);
        recompute_consumption(&mut locations);
        assert_eq!(consumption_of(&locations, "p", "r"), 240.0);
    }

    #[test]
    fn value_variant_matches_in_place() {
        let locations = vec![
            Location::new("p", "Producer").produces(res("r"), 5.0),
            Location::new("c", "Consumer")
                .with_source("p")
                .consumes(res("r"), 2.0),
        ];
        let mut in_place = locations.clone();
        recompute_consumption(&mut in_place);
        assert_eq!(recompute(locations), in_place);
    }

    #[test]
    fn summary_flags_over_drawn_outputs() {
        let locations = recompute(vec![
            Location::new("p", "Producer")
                .produces(Resource::new("r", "Rotor", ""), 10.0)
                .produces(res("s"), 10.0),
            Location::new("c", "Consumer")
                .with_source("p")
                .consumes(res("r"), 15.0)
                .consumes(res("q"), 1.0),
        ]);
        let summary = summarize(&locations);

        let over: Vec<_> = summary.over_drawn().map(|(_, o)| o.class_name.as_str()).collect();
        assert_eq!(over, vec!["r"]);

        let totals: HashMap<_, _> = summary.totals.iter().cloned().collect();
        assert_eq!(totals["r"].consumed, 15.0);
        assert_eq!(totals["r"].demanded, 15.0);
        assert_eq!(totals["s"].consumed, 0.0);
        assert_eq!(totals["q"].produced, 0.0);
        assert_eq!(totals["q"].demanded, 1.0);

        let text = summary.to_string();
        assert!(text.contains("Rotor"));
        assert!(text.contains("OVER"));
    }

    fn arb_locations() -> impl Strategy<Value = Vec<Location>> {
        let classes = ["a", "b", "c"];
        prop::collection::vec(
            (
                prop::collection::vec(0usize..6, 0..4),
                prop::collection::vec((0usize..3, 0u32..500), 0..3),
                prop::collection::vec((0usize..3, 0u32..500), 0..3),
            ),
            1..6,
        )
        .prop_map(move |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(idx, (sources, consumes, produces))| {
                    let mut location = Location::new(&format!("loc-{idx}"), "L");
                    for s in sources {
                        location = location.with_source(&format!("loc-{s}"));
                    }
                    for (c, amount) in consumes {
                        location = location.consumes(res(classes[c]), amount as f64);
                    }
                    for (c, amount) in produces {
                        location = location.produces(res(classes[c]), amount as f64);
                    }
                    location
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn order_does_not_change_result(locations in arb_locations()) {
            let forward = recompute(locations.clone());
            let mut reversed = locations;
            reversed.reverse();
            let mut backward = recompute(reversed);
            backward.reverse();
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn recompute_is_idempotent(locations in arb_locations()) {
            let once = recompute(locations);
            let twice = recompute(once.clone());
            prop_assert_eq!(once, twice);
        }
    }
}
