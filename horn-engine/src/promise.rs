//! The promise tree: lazy backtracking, cut, and exception unwinding.
//!
//! A [`Promise`] is a lazily evaluated description of the remaining
//! search.  The [`Forcer`] drives a promise to a terminal outcome with
//! an explicit frame stack instead of native recursion: each [`Choice`]
//! becomes a frame recording its cut barrier, an environment
//! checkpoint, its untried alternatives, and (for `catch/3`) a recover
//! handler.  Backtracking restores the checkpoint and pops the next
//! alternative; a cut truncates the stack through the frame tagged
//! with its barrier; an error unwinds the stack firing recover
//! handlers on the way out.
//!
//! The forcer is resumable: after a success the stack is left in
//! place, and the next solution is obtained by resuming as if the
//! consumer of the first one had failed.

use crate::{Exception, Machine};
use horn_terms::{Checkpoint, Env, Term};
use std::collections::VecDeque;
use std::rc::Rc;

/// Identifies the choice frames a cut may prune.  Fresh ids come from
/// the machine's monotonic counter, one per activation.
pub type BarrierId = u64;

/// A deferred slice of search, run at most once.
pub type Thunk = Box<dyn FnOnce(&mut Machine, &mut Env) -> Promise>;

/// A success continuation: what to do after the current goal succeeds.
/// Invoked once per solution, so it is shared and re-runnable.
pub type Cont = Rc<dyn Fn(&mut Machine, &mut Env) -> Promise>;

/// A `catch/3` handler.  Returns `None` when the ball does not unify
/// with the catcher, in which case unwinding continues outward.
pub type Recover = Box<dyn FnOnce(&mut Machine, &mut Env, Term) -> Option<Promise>>;

/// An ordered sequence of alternative branches, tried left to right.
pub struct Choice {
    /// The cut barrier this frame answers to, if any.
    pub barrier: Option<BarrierId>,
    /// Untried alternatives.
    pub alts: VecDeque<Thunk>,
    /// Exception handler guarding everything executed under this frame.
    pub recover: Option<Recover>,
}

/// A lazily evaluated description of the remaining search.
pub enum Promise {
    /// Terminal success or failure.
    Bool(bool),
    /// Terminal error.
    Error(Exception),
    /// A thunk producing the real promise on demand.
    Delayed(Thunk),
    /// Alternatives for backtracking.
    Choice(Choice),
    /// Commit to the frame tagged `barrier`, then continue.
    CutBarrier { barrier: BarrierId, then: Thunk },
}

impl Promise {
    /// Terminal success.
    #[inline]
    pub fn ok() -> Self {
        Self::Bool(true)
    }

    /// Terminal failure.
    #[inline]
    pub fn fail() -> Self {
        Self::Bool(false)
    }

    /// Defer computing a promise until it is forced.
    pub fn delay(f: impl FnOnce(&mut Machine, &mut Env) -> Promise + 'static) -> Self {
        Self::Delayed(Box::new(f))
    }

    /// A bare choice among alternatives, transparent to cut.
    pub fn choice(alts: impl IntoIterator<Item = Thunk>) -> Self {
        Self::Choice(Choice {
            barrier: None,
            alts: alts.into_iter().collect(),
            recover: None,
        })
    }

    /// A choice answering to the given cut barrier.
    pub fn barrier_choice(barrier: BarrierId, alts: impl IntoIterator<Item = Thunk>) -> Self {
        Self::Choice(Choice {
            barrier: Some(barrier),
            alts: alts.into_iter().collect(),
            recover: None,
        })
    }
}

struct Frame {
    barrier: Option<BarrierId>,
    mark: Checkpoint,
    alts: VecDeque<Thunk>,
    recover: Option<Recover>,
}

/// Drives promises to terminal outcomes.
#[derive(Default)]
pub struct Forcer {
    frames: Vec<Frame>,
}

impl Forcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `p` to a terminal outcome.  `Ok(true)` leaves the frame
    /// stack in place so [`resume`](Self::resume) can look for the
    /// next solution; `Ok(false)` means the search is exhausted.
    pub fn force(
        &mut self,
        m: &mut Machine,
        env: &mut Env,
        mut p: Promise,
    ) -> Result<bool, Exception> {
        loop {
            p = match p {
                Promise::Bool(true) => return Ok(true),
                Promise::Bool(false) => match self.backtrack(m, env) {
                    Some(next) => next,
                    None => return Ok(false),
                },
                Promise::Error(Exception::Halt(code)) => {
                    self.frames.clear();
                    return Err(Exception::Halt(code));
                }
                Promise::Error(Exception::Ball(ball)) => self.unwind(m, env, ball)?,
                Promise::Delayed(thunk) => thunk(m, env),
                Promise::Choice(c) => {
                    self.frames.push(Frame {
                        barrier: c.barrier,
                        mark: env.checkpoint(),
                        alts: c.alts,
                        recover: c.recover,
                    });
                    Promise::Bool(false)
                }
                Promise::CutBarrier { barrier, then } => {
                    self.cut_to(barrier);
                    then(m, env)
                }
            };
        }
    }

    /// Backtrack for the next solution after a success.
    pub fn resume(&mut self, m: &mut Machine, env: &mut Env) -> Result<bool, Exception> {
        self.force(m, env, Promise::Bool(false))
    }

    /// Restore the nearest checkpoint with an untried alternative and
    /// run it.  Exhausted frames are discarded on the way.
    fn backtrack(&mut self, m: &mut Machine, env: &mut Env) -> Option<Promise> {
        loop {
            let top = self.frames.last_mut()?;
            match top.alts.pop_front() {
                Some(alt) => {
                    env.restore(top.mark);
                    return Some(alt(m, env));
                }
                None => {
                    self.frames.pop();
                }
            }
        }
    }

    /// Drop every frame above, and including, the one tagged `barrier`.
    /// A barrier whose frame is already gone has nothing left to prune.
    fn cut_to(&mut self, barrier: BarrierId) {
        if let Some(i) = self
            .frames
            .iter()
            .rposition(|f| f.barrier == Some(barrier))
        {
            self.frames.truncate(i);
        }
    }

    /// Unwind after a thrown ball: pop frames, offering the ball to
    /// each recover handler.  A handler that declines (catcher does
    /// not unify) passes the ball further out.
    fn unwind(
        &mut self,
        m: &mut Machine,
        env: &mut Env,
        ball: Term,
    ) -> Result<Promise, Exception> {
        while let Some(mut frame) = self.frames.pop() {
            if let Some(recover) = frame.recover.take() {
                env.restore(frame.mark);
                if let Some(p) = recover(m, env, ball.clone()) {
                    return Ok(p);
                }
            }
        }
        Err(Exception::Ball(ball))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Machine;
    use horn_terms::{unify, Term, Var};

    #[test]
    fn choice_tries_alternatives_in_order() {
        let mut m = Machine::with_buffers();
        let mut env = Env::new();
        let x = Var::fresh();
        let alts: Vec<Thunk> = vec![
            {
                let x = x.clone();
                Box::new(move |_: &mut Machine, env: &mut Env| {
                    unify(env, &Term::var(x), &Term::int(1));
                    Promise::ok()
                })
            },
            {
                let x = x.clone();
                Box::new(move |_: &mut Machine, env: &mut Env| {
                    unify(env, &Term::var(x), &Term::int(2));
                    Promise::ok()
                })
            },
        ];
        let mut forcer = Forcer::new();
        assert!(forcer.force(&mut m, &mut env, Promise::choice(alts)).unwrap());
        assert_eq!(env.resolve(&Term::var(x.clone())), &Term::int(1));
        // resuming restores the checkpoint and tries the next branch
        assert!(forcer.resume(&mut m, &mut env).unwrap());
        assert_eq!(env.resolve(&Term::var(x.clone())), &Term::int(2));
        assert!(!forcer.resume(&mut m, &mut env).unwrap());
        assert!(env.lookup(x.id()).is_none());
    }

    #[test]
    fn cut_prunes_through_its_barrier() {
        let mut m = Machine::with_buffers();
        let mut env = Env::new();
        let barrier = 42;
        let alts: Vec<Thunk> = vec![
            Box::new(move |_: &mut Machine, _: &mut Env| Promise::CutBarrier {
                barrier,
                then: Box::new(|_, _| Promise::ok()),
            }),
            Box::new(|_: &mut Machine, _: &mut Env| Promise::ok()),
        ];
        let mut forcer = Forcer::new();
        assert!(forcer
            .force(&mut m, &mut env, Promise::barrier_choice(barrier, alts))
            .unwrap());
        // the second alternative was discarded by the cut
        assert!(!forcer.resume(&mut m, &mut env).unwrap());
    }

    #[test]
    fn errors_skip_plain_frames() {
        let mut m = Machine::with_buffers();
        let mut env = Env::new();
        let alts: Vec<Thunk> = vec![
            Box::new(|_: &mut Machine, _: &mut Env| {
                Promise::Error(Exception::Ball(Term::atom("boom")))
            }),
            Box::new(|_: &mut Machine, _: &mut Env| Promise::ok()),
        ];
        let mut forcer = Forcer::new();
        let err = forcer
            .force(&mut m, &mut env, Promise::choice(alts))
            .unwrap_err();
        assert!(matches!(err, Exception::Ball(t) if t == Term::atom("boom")));
    }

    #[test]
    fn recover_handler_intercepts_the_ball() {
        let mut m = Machine::with_buffers();
        let mut env = Env::new();
        let p = Promise::Choice(Choice {
            barrier: None,
            alts: VecDeque::from([Box::new(|_: &mut Machine, _: &mut Env| {
                Promise::Error(Exception::Ball(Term::atom("boom")))
            }) as Thunk]),
            recover: Some(Box::new(|_, _, ball| {
                (ball == Term::atom("boom")).then(Promise::ok)
            })),
        });
        let mut forcer = Forcer::new();
        assert!(forcer.force(&mut m, &mut env, p).unwrap());
    }
}
