//! Owned location collection with propagation after every edit

use tracing::debug;

use crate::error::{PlannerError, Result};
use crate::models::{ConsumptionRecord, Location, ProductionRecord, Resource};
use crate::propagate::{PlanSummary, recompute_consumption, summarize};

#[derive(Debug, Default, Clone)]
pub struct Plan {
    locations: Vec<Location>,
}

impl Plan {
    pub fn new(locations: Vec<Location>) -> Self {
        let mut plan = Self { locations };
        plan.recompute();
        plan
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn get(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    pub fn summary(&self) -> PlanSummary {
        summarize(&self.locations)
    }

    fn recompute(&mut self) {
        recompute_consumption(&mut self.locations);
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Location> {
        self.locations
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| PlannerError::UnknownLocation(id.to_string()))
    }

    fn require(&self, id: &str) -> Result<()> {
        match self.get(id) {
            Some(_) => Ok(()),
            None => Err(PlannerError::UnknownLocation(id.to_string())),
        }
    }

    /// Next free `loc-<n>` id
    fn next_id(&self) -> String {
        let next = self
            .locations
            .iter()
            .filter_map(|l| l.id.strip_prefix("loc-")?.parse::<u64>().ok())
            .max()
            .map_or(1, |n| n + 1);
        format!("loc-{}", next)
    }

    pub fn add_location(&mut self, name: &str) -> Result<String> {
        let name = validate_name(name)?;
        let id = self.next_id();
        self.locations.push(Location::new(&id, name));
        debug!(%id, name, "added location");
        Ok(id)
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        self.get_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Remove a location and every link pointing at it
    pub fn remove_location(&mut self, id: &str) -> Result<Location> {
        let idx = self
            .locations
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| PlannerError::UnknownLocation(id.to_string()))?;
        let removed = self.locations.remove(idx);

        for location in &mut self.locations {
            location.resource_sources.retain(|s| s != id);
        }

        self.recompute();
        Ok(removed)
    }

    /// Append `source` to `consumer`'s sources. Repeated links count once each.
    pub fn link(&mut self, consumer: &str, source: &str) -> Result<()> {
        self.require(source)?;
        self.get_mut(consumer)?
            .resource_sources
            .push(source.to_string());
        self.recompute();
        Ok(())
    }

    /// Drop every link from `consumer` to `source`
    pub fn unlink(&mut self, consumer: &str, source: &str) -> Result<()> {
        self.get_mut(consumer)?
            .resource_sources
            .retain(|s| s != source);
        self.recompute();
        Ok(())
    }

    /// Replace every consumption record for this class name with one record.
    /// A non-positive amount just removes them.
    pub fn set_consumption(&mut self, id: &str, resource: Resource, amount: f64) -> Result<()> {
        let records = &mut self.get_mut(id)?.consumption;
        records.retain(|r| r.resource != resource);
        if amount > 0.0 {
            records.push(ConsumptionRecord { resource, amount });
        }
        self.recompute();
        Ok(())
    }

    /// Replace every production record for this class name with one record.
    /// A non-positive amount just removes them.
    pub fn set_production(&mut self, id: &str, resource: Resource, amount: f64) -> Result<()> {
        let records = &mut self.get_mut(id)?.production;
        records.retain(|r| r.resource != resource);
        if amount > 0.0 {
            records.push(ProductionRecord {
                resource,
                amount,
                consumption: 0.0,
            });
        }
        self.recompute();
        Ok(())
    }

    pub fn replace_all(&mut self, locations: Vec<Location>) {
        self.locations = locations;
        self.recompute();
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PlannerError::EmptyName);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iron() -> Resource {
        Resource::new("desc-ore-iron-c", "Iron Ore", "")
    }

    fn mine_and_smelter() -> (Plan, String, String) {
        let mut plan = Plan::default();
        let mine = plan.add_location("Mine").unwrap();
        let smelter = plan.add_location("Smelter").unwrap();
        plan.set_production(&mine, iron(), 120.0).unwrap();
        plan.set_consumption(&smelter, Resource::bare("desc-ore-iron-c"), 30.0)
            .unwrap();
        (plan, mine, smelter)
    }

    fn drawn(plan: &Plan, id: &str) -> f64 {
        plan.get(id)
            .and_then(|l| l.production_of("desc-ore-iron-c"))
            .map(|p| p.consumption)
            .unwrap()
    }

    #[test]
    fn ids_follow_highest_suffix() {
        let mut plan = Plan::new(vec![Location::new("loc-7", "Old"), Location::new("custom", "C")]);
        assert_eq!(plan.add_location("New").unwrap(), "loc-8");
        assert!(matches!(plan.add_location("  "), Err(PlannerError::EmptyName)));
    }

    #[test]
    fn link_and_unlink_drive_consumption() {
        let (mut plan, mine, smelter) = mine_and_smelter();
        assert_eq!(drawn(&plan, &mine), 0.0);

        plan.link(&smelter, &mine).unwrap();
        assert_eq!(drawn(&plan, &mine), 30.0);

        plan.link(&smelter, &mine).unwrap();
        assert_eq!(drawn(&plan, &mine), 60.0);

        plan.unlink(&smelter, &mine).unwrap();
        assert_eq!(drawn(&plan, &mine), 0.0);
    }

    #[test]
    fn editing_amounts_updates_producers() {
        let (mut plan, mine, smelter) = mine_and_smelter();
        plan.link(&smelter, &mine).unwrap();

        plan.set_consumption(&smelter, iron(), 45.0).unwrap();
        assert_eq!(plan.get(&smelter).unwrap().consumption.len(), 1);
        assert_eq!(drawn(&plan, &mine), 45.0);

        plan.set_consumption(&smelter, iron(), 0.0).unwrap();
        assert!(plan.get(&smelter).unwrap().consumption.is_empty());
        assert_eq!(drawn(&plan, &mine), 0.0);
    }

    #[test]
    fn editing_collapses_imported_duplicates() {
        let mut plan = Plan::new(vec![
            Location::new("p", "Producer")
                .produces(iron(), 100.0)
                .produces(iron(), 80.0),
            Location::new("c", "Consumer")
                .with_source("p")
                .consumes(iron(), 10.0)
                .consumes(iron(), 35.0),
        ]);
        assert_eq!(drawn(&plan, "p"), 35.0);

        plan.set_consumption("c", Resource::bare("desc-ore-iron-c"), 50.0)
            .unwrap();
        let amounts: Vec<f64> = plan.get("c").unwrap().consumption.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![50.0]);
        assert_eq!(drawn(&plan, "p"), 50.0);

        plan.set_production("p", iron(), 60.0).unwrap();
        let producer = plan.get("p").unwrap();
        assert_eq!(producer.production.len(), 1);
        assert_eq!(producer.production[0].amount, 60.0);
        assert_eq!(producer.production[0].consumption, 50.0);
    }

    #[test]
    fn removing_a_location_drops_links() {
        let (mut plan, mine, smelter) = mine_and_smelter();
        plan.link(&smelter, &mine).unwrap();
        plan.remove_location(&mine).unwrap();
        assert!(plan.get(&smelter).unwrap().resource_sources.is_empty());
        assert!(plan.get(&mine).is_none());
    }

    #[test]
    fn unknown_ids_leave_plan_untouched() {
        let (mut plan, mine, _) = mine_and_smelter();
        let before = plan.locations().to_vec();
        assert!(matches!(
            plan.link("nope", &mine),
            Err(PlannerError::UnknownLocation(_))
        ));
        assert!(matches!(
            plan.link(&mine, "nope"),
            Err(PlannerError::UnknownLocation(_))
        ));
        assert!(plan.rename("nope", "X").is_err());
        assert_eq!(plan.locations(), before.as_slice());
    }

    #[test]
    fn replace_all_recomputes() {
        let mut plan = Plan::default();
        let mut stale = Location::new("a", "A").produces(iron(), 10.0);
        stale.production[0].consumption = 5.0;
        plan.replace_all(vec![stale]);
        assert_eq!(drawn(&plan, "a"), 0.0);
    }
}
