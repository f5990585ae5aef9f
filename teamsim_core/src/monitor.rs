//! QueueMonitor - periodic length sampling.

use crate::actor::Actor;
use crate::error::SimError;
use crate::log::QueueOp;
use crate::registry::Category;
use crate::world::{QueueId, SimContext};

use teamsim_env::Wake;

/// Samples queue lengths, then sleeps for the monitor interval.
///
/// The first sample is taken at the instant the monitor starts. Sampling
/// only reads the queues.
pub struct QueueMonitor {
    id: u64,

    /// `None` watches every queue that exists at sampling time
    watched: Option<Vec<QueueId>>,
}

impl QueueMonitor {
    pub fn new(id: u64) -> Self {
        Self { id, watched: None }
    }

    pub fn watching(id: u64, queues: Vec<QueueId>) -> Self {
        Self {
            id,
            watched: Some(queues),
        }
    }

    fn sample(&self, ctx: &mut SimContext<'_>) {
        let now = ctx.now();
        let ids: Vec<QueueId> = match &self.watched {
            Some(queues) => queues.clone(),
            None => ctx.world.queues.ids().collect(),
        };

        for id in ids {
            if let Some(queue) = ctx.world.queues.get(id) {
                let (name, len) = (queue.name.clone(), queue.store.len());
                ctx.world.log.queue(now, &name, QueueOp::Length, len);
            }
        }
    }
}

impl Actor for QueueMonitor {
    const CATEGORY: Category = Category::QueueMonitor;

    fn id(&self) -> u64 {
        self.id
    }

    fn resume(&mut self, _wake: Wake, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        self.sample(ctx);
        let interval = ctx.world.config.monitor_interval;
        ctx.sleep(interval);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{spawn, Simulation};
    use crate::config::{Arrivals, ModelConfig};
    use crate::work::{Priority, WorkItem};
    use crate::world::{World, CODE_QUEUE};
    use std::time::Duration;
    use teamsim_env::{ProcessId, Scheduler};

    fn sim() -> Simulation {
        let config = ModelConfig {
            n_coder: 1,
            fragment_size: Duration::from_secs(1),
            interrupts: None,
            interrupt_duration: Duration::from_secs(1),
            monitor_interval: Duration::from_secs(5),
            arrivals: Arrivals::Scripted(Vec::new()),
            code_queue_capacity: None,
        };
        Simulation::new(World::new(config, 0))
    }

    #[test]
    fn test_samples_at_start_and_every_interval() {
        let mut sim = sim();
        spawn(&mut sim, QueueMonitor::new).unwrap();

        sim.run(Duration::from_secs(12)).unwrap();

        let samples = sim.world().log.samples_of(CODE_QUEUE);
        let times: Vec<u64> = samples.iter().map(|(t, _)| t.as_secs()).collect();
        assert_eq!(times, vec![0, 5, 10]);
    }

    #[test]
    fn test_sampling_does_not_touch_queues() {
        let mut sim = sim();
        let world = sim.world_mut();
        let job = world.create_item(
            |id| WorkItem::job(id, Duration::from_secs(1), Priority::Low, false, Duration::ZERO),
            Category::Job,
        );
        let queue = world.code_queue();
        world
            .put(queue, job, ProcessId(usize::MAX), &mut Scheduler::new())
            .unwrap();

        spawn(&mut sim, QueueMonitor::new).unwrap();
        sim.run(Duration::from_secs(11)).unwrap();

        assert_eq!(sim.world().queues.len_of(queue), 1);
        assert_eq!(
            sim.world().log.samples_of(CODE_QUEUE),
            vec![
                (Duration::ZERO, 1),
                (Duration::from_secs(5), 1),
                (Duration::from_secs(10), 1)
            ]
        );
    }

    #[test]
    fn test_watching_subset() {
        let mut sim = sim();
        let extra = sim.world_mut().queues.add("test", None);
        spawn(&mut sim, |id| QueueMonitor::watching(id, vec![extra])).unwrap();

        sim.run(Duration::from_secs(1)).unwrap();

        assert!(sim.world().log.samples_of(CODE_QUEUE).is_empty());
        assert_eq!(sim.world().log.samples_of("test"), vec![(Duration::ZERO, 0)]);
    }
}
