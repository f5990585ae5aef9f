//! JobSource - feeds fresh jobs into the shared queue.
//!
//! A Poisson source puts a job as soon as it starts, then waits an
//! interarrival gap before the next one. A scripted source puts each job at
//! its listed time. Either way a put that hits a full shared queue suspends
//! the source until the queue admits the job.

use crate::actor::Actor;
use crate::config::{Arrivals, PoissonArrivals, ScriptedJob};
use crate::error::SimError;
use crate::registry::Category;
use crate::work::{Priority, WorkItem};
use crate::world::SimContext;

use std::time::Duration;
use teamsim_env::{PutStatus, RequestId, Wake};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceState {
    Idle,
    Sleeping,
    Blocked(RequestId),
    /// Script exhausted
    Done,
}

pub struct JobSource {
    id: u64,
    arrivals: Arrivals,
    state: SourceState,

    /// Next scripted job to release
    cursor: usize,
}

impl JobSource {
    pub fn new(id: u64, arrivals: Arrivals) -> Self {
        Self {
            id,
            arrivals,
            state: SourceState::Idle,
            cursor: 0,
        }
    }

    /// Creates a job and puts it on the shared queue. Returns false if the put blocked.
    fn release(
        &mut self,
        duration: Duration,
        priority: Priority,
        decompose: bool,
        ctx: &mut SimContext<'_>,
    ) -> Result<bool, SimError> {
        let now = ctx.now();
        let pid = ctx.pid();
        let item = ctx.world.create_item(
            |id| WorkItem::job(id, duration, priority, decompose, now),
            Category::Job,
        );
        debug!(source = self.id, item = item.0, ?duration, ?priority, decompose, "job arrival");

        let queue = ctx.world.code_queue();
        match ctx.world.put(queue, item, pid, ctx.scheduler)? {
            PutStatus::Stored => Ok(true),
            PutStatus::Blocked(request) => {
                self.state = SourceState::Blocked(request);
                Ok(false)
            }
        }
    }

    /// Poisson arrival: draw a job, put it, then wait for the next one.
    fn arrive(&mut self, poisson: &PoissonArrivals, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        let (duration, priority, decompose) = poisson.draw(&mut ctx.world.rng)?;
        if self.release(duration, priority, decompose, ctx)? {
            self.proceed(ctx)?;
        }
        Ok(())
    }

    /// Arranges the next suspension once the previous put went through.
    fn proceed(&mut self, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        match &self.arrivals {
            Arrivals::Poisson(poisson) => {
                let gap = poisson.interarrival.sample(&mut ctx.world.rng)?;
                ctx.sleep(gap);
                self.state = SourceState::Sleeping;
                Ok(())
            }
            Arrivals::Scripted(jobs) => {
                let jobs = jobs.clone();
                self.release_due(&jobs, ctx)
            }
        }
    }

    /// Releases every scripted job due by now, then sleeps until the next one.
    fn release_due(&mut self, jobs: &[ScriptedJob], ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        while let Some(job) = jobs.get(self.cursor) {
            let now = ctx.now();
            if job.at > now {
                ctx.sleep(job.at - now);
                self.state = SourceState::Sleeping;
                return Ok(());
            }

            self.cursor += 1;
            if !self.release(job.duration, job.priority, job.decompose, ctx)? {
                return Ok(());
            }
        }

        debug!(source = self.id, released = self.cursor, "script exhausted");
        self.state = SourceState::Done;
        Ok(())
    }
}

impl Actor for JobSource {
    const CATEGORY: Category = Category::JobSource;

    fn id(&self) -> u64 {
        self.id
    }

    fn resume(&mut self, wake: Wake, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        match (self.state, wake) {
            (SourceState::Idle, Wake::Start) | (SourceState::Sleeping, Wake::Timeout) => {
                match &self.arrivals {
                    Arrivals::Poisson(poisson) => {
                        let poisson = poisson.clone();
                        self.arrive(&poisson, ctx)
                    }
                    Arrivals::Scripted(_) => self.proceed(ctx),
                }
            }
            (SourceState::Blocked(pending), Wake::Admitted(request)) if pending == request => {
                self.proceed(ctx)
            }
            (state, wake) => {
                trace!(source = self.id, ?state, ?wake, "stale wake ignored");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{spawn, Simulation};
    use crate::config::{Interarrival, ModelConfig};
    use crate::work::WorkKind;
    use crate::world::{World, CODE_QUEUE};

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn scripted(at: u64, duration: u64) -> ScriptedJob {
        ScriptedJob {
            at: secs(at),
            duration: secs(duration),
            priority: Priority::Medium,
            decompose: false,
        }
    }

    fn sim(arrivals: Arrivals, capacity: Option<usize>) -> Simulation {
        let config = ModelConfig {
            n_coder: 1,
            fragment_size: secs(1),
            interrupts: None,
            interrupt_duration: secs(1),
            monitor_interval: secs(5),
            arrivals,
            code_queue_capacity: capacity,
        };
        Simulation::new(World::new(config, 11))
    }

    fn job_times(sim: &Simulation) -> Vec<Duration> {
        sim.world()
            .ledger
            .items()
            .filter(|(_, item)| matches!(item.kind, WorkKind::Job { .. }))
            .map(|(_, item)| item.t_create)
            .collect()
    }

    #[test]
    fn test_scripted_jobs_arrive_on_time() {
        let arrivals = Arrivals::Scripted(vec![scripted(0, 1), scripted(0, 2), scripted(4, 1)]);
        let mut sim = sim(arrivals.clone(), None);
        spawn(&mut sim, |id| JobSource::new(id, arrivals)).unwrap();

        sim.run(secs(10)).unwrap();

        assert_eq!(job_times(&sim), vec![secs(0), secs(0), secs(4)]);
        assert_eq!(sim.world().queues.len_of(sim.world().code_queue()), 3);
        assert_eq!(sim.world().registry.instances(Category::Job), &[0, 1, 2]);
    }

    #[test]
    fn test_full_queue_blocks_source() {
        let arrivals = Arrivals::Scripted(vec![scripted(0, 1), scripted(1, 1), scripted(2, 1)]);
        let mut sim = sim(arrivals.clone(), Some(1));
        spawn(&mut sim, |id| JobSource::new(id, arrivals)).unwrap();

        sim.run(secs(10)).unwrap();

        // The second job was created but waits outside the queue
        assert_eq!(job_times(&sim), vec![secs(0), secs(1)]);
        let world = sim.world();
        assert_eq!(world.queues.len_of(world.code_queue()), 1);
        let puts = world
            .log
            .queue_records()
            .iter()
            .filter(|r| r.name == CODE_QUEUE)
            .count();
        assert_eq!(puts, 1);
    }

    #[test]
    fn test_poisson_source_puts_immediately() {
        let arrivals = Arrivals::Poisson(PoissonArrivals {
            interarrival: Interarrival::Exponential { mean: secs(1) },
            develop_mu: 0.5,
            develop_sigma: 0.6,
            p_decompose: 0.5,
            p_priority: (0.2, 0.8),
        });
        let mut sim = sim(arrivals.clone(), None);
        spawn(&mut sim, |id| JobSource::new(id, arrivals)).unwrap();

        sim.run(secs(100)).unwrap();

        let times = job_times(&sim);
        assert_eq!(times[0], Duration::ZERO);
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        // Roughly one arrival per second
        assert!((60..140).contains(&times.len()), "{} arrivals", times.len());
    }
}
