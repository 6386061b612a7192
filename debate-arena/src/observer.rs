use crate::session::{Session, Turn};
use crate::verdict::Verdict;

/// Receives scheduler output as it happens.
///
/// `on_turn` fires once per completed turn, before the turn is appended to
/// the session. `on_judging` fires once when the judge is called, even when
/// no turn was played. `on_verdict` fires once, after the verdict is stored.
pub trait DebateObserver: Send {
    fn on_turn(&mut self, _turn: &Turn) {}

    fn on_judging(&mut self, _session: &Session) {}

    fn on_verdict(&mut self, _session: &Session, _verdict: &Verdict) {}
}

/// Discards everything.
impl DebateObserver for () {}

impl<O: DebateObserver + ?Sized> DebateObserver for Box<O> {
    fn on_turn(&mut self, turn: &Turn) {
        (**self).on_turn(turn);
    }

    fn on_judging(&mut self, session: &Session) {
        (**self).on_judging(session);
    }

    fn on_verdict(&mut self, session: &Session, verdict: &Verdict) {
        (**self).on_verdict(session, verdict);
    }
}

/// Lets a caller keep ownership of an observer and inspect it after the run.
impl<O: DebateObserver + ?Sized> DebateObserver for &mut O {
    fn on_turn(&mut self, turn: &Turn) {
        (**self).on_turn(turn);
    }

    fn on_judging(&mut self, session: &Session) {
        (**self).on_judging(session);
    }

    fn on_verdict(&mut self, session: &Session, verdict: &Verdict) {
        (**self).on_verdict(session, verdict);
    }
}

/// Fan-out in insertion order.
impl<O: DebateObserver> DebateObserver for Vec<O> {
    fn on_turn(&mut self, turn: &Turn) {
        for observer in self.iter_mut() {
            observer.on_turn(turn);
        }
    }

    fn on_judging(&mut self, session: &Session) {
        for observer in self.iter_mut() {
            observer.on_judging(session);
        }
    }

    fn on_verdict(&mut self, session: &Session, verdict: &Verdict) {
        for observer in self.iter_mut() {
            observer.on_verdict(session, verdict);
        }
    }
}
