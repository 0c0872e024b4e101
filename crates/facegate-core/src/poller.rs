//! Acceptance poller — decides when a stream of face samples yields a usable
//! descriptor.
//!
//! The poller is a plain state machine: it owns the counters, the session
//! owns the timer. Every resolved detection is fed to [`Poller::observe`],
//! which returns what the caller should show and whether to stop.
//!
//! ```text
//! Idle ──start──▶ Sampling ──observe──▶ Accepted
//!   ▲                │   └────observe──▶ Abandoned
//!   └─────stop───────┘
//! ```

use crate::types::{DetectedFace, Descriptor};
use serde::{Deserialize, Serialize};

// --- Defaults ---
const GOOD_SCORE: f32 = 0.9;
const ACCEPT_SCORE: f32 = 0.99;
const GOOD_SAMPLES: u32 = 10;
const WARN_EVERY: u32 = 50;
const MAX_ATTEMPTS: u32 = 300;

/// Thresholds governing acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptancePolicy {
    /// A single-face score above this counts as a good sample.
    pub good_score: f32,
    /// A single-face score above this is accepted immediately.
    pub accept_score: f32,
    /// Accept once the good-sample count exceeds this.
    pub good_samples: u32,
    /// Emit the "improve conditions" warning every this many attempts (0 disables).
    pub warn_every: u32,
    /// Abandon once attempts exceed this.
    pub max_attempts: u32,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            good_score: GOOD_SCORE,
            accept_score: ACCEPT_SCORE,
            good_samples: GOOD_SAMPLES,
            warn_every: WARN_EVERY,
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

/// Counters for the current visible period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollState {
    /// Resolved detections since the session was last shown.
    pub attempts: u32,
    /// Single-face samples scoring above `good_score`. Not reset by bad samples.
    pub good_samples: u32,
    /// Progress shown to the user, 0–100.
    pub percent: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sampling,
    Accepted,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Continue,
    Accept(Descriptor),
    Abandon,
}

/// What one observed sample produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub percent: u8,
    /// Show the "improve conditions" warning.
    pub warn: bool,
    pub verdict: Verdict,
}

pub struct Poller {
    policy: AcceptancePolicy,
    state: PollState,
    phase: Phase,
}

impl Poller {
    pub fn new(policy: AcceptancePolicy) -> Self {
        Self {
            policy,
            state: PollState::default(),
            phase: Phase::Idle,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_sampling(&self) -> bool {
        self.phase == Phase::Sampling
    }

    /// Zero the counters and return to `Idle`, whatever the current phase.
    pub fn reset(&mut self) {
        self.state = PollState::default();
        self.phase = Phase::Idle;
    }

    /// Enter `Sampling`. Returns false unless the poller was `Idle`.
    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        self.phase = Phase::Sampling;
        true
    }

    /// Leave `Sampling` without a verdict. Terminal phases are kept.
    pub fn stop(&mut self) {
        if self.phase == Phase::Sampling {
            self.phase = Phase::Idle;
        }
    }

    /// Feed one resolved detection.
    ///
    /// Outside `Sampling` the sample is ignored and the verdict is `Continue`.
    pub fn observe(&mut self, mut faces: Vec<DetectedFace>) -> TickOutcome {
        if self.phase != Phase::Sampling {
            return TickOutcome {
                percent: self.state.percent,
                warn: false,
                verdict: Verdict::Continue,
            };
        }

        self.state.attempts += 1;
        let attempts = self.state.attempts;

        if attempts > self.policy.max_attempts {
            self.phase = Phase::Abandoned;
            tracing::debug!(attempts, "attempt ceiling exceeded");
            return TickOutcome {
                percent: self.state.percent,
                warn: false,
                verdict: Verdict::Abandon,
            };
        }

        let warn = self.policy.warn_every != 0 && attempts % self.policy.warn_every == 0;

        let verdict = if faces.len() == 1 {
            let face = faces.remove(0);
            let score = face.score();
            self.state.percent = score_percent(score);

            if score > self.policy.good_score {
                self.state.good_samples += 1;
            }
            if score > self.policy.accept_score
                || (score > self.policy.good_score
                    && self.state.good_samples > self.policy.good_samples)
            {
                self.phase = Phase::Accepted;
                tracing::debug!(
                    attempts,
                    score,
                    good_samples = self.state.good_samples,
                    "sample accepted"
                );
                Verdict::Accept(face.descriptor)
            } else {
                Verdict::Continue
            }
        } else {
            // No single face: let the progress ring fall back toward zero.
            self.state.percent /= 2;
            Verdict::Continue
        };

        TickOutcome {
            percent: self.state.percent,
            warn,
            verdict,
        }
    }
}

/// Map a detection score onto 0–100.
fn score_percent(score: f32) -> u8 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, FaceDetection};

    fn face(score: f32, tag: f32) -> DetectedFace {
        DetectedFace {
            detection: FaceDetection {
                bbox: BoundingBox::default(),
                score,
                landmarks: None,
            },
            descriptor: Descriptor::new(vec![tag; 4]),
        }
    }

    fn sampling() -> Poller {
        let mut p = Poller::new(AcceptancePolicy::default());
        assert!(p.start());
        p
    }

    #[test]
    fn test_accepts_on_very_high_score() {
        let mut p = sampling();
        let scores = [0.5, 0.8, 0.95, 0.995];
        let mut last = None;
        for (i, s) in scores.iter().enumerate() {
            last = Some(p.observe(vec![face(*s, i as f32)]));
        }
        let out = last.unwrap();
        assert_eq!(out.verdict, Verdict::Accept(Descriptor::new(vec![3.0; 4])));
        assert_eq!(out.percent, 100);
        assert_eq!(p.phase(), Phase::Accepted);
    }

    #[test]
    fn test_sustained_good_score_accepts_on_eleventh_sample() {
        let mut p = sampling();
        for i in 0..10 {
            let out = p.observe(vec![face(0.95, i as f32)]);
            assert_eq!(out.verdict, Verdict::Continue, "sample {i}");
            assert_eq!(out.percent, 95);
        }
        let out = p.observe(vec![face(0.95, 10.0)]);
        assert_eq!(out.verdict, Verdict::Accept(Descriptor::new(vec![10.0; 4])));
        assert_eq!(p.state().good_samples, 11);
        assert_eq!(p.state().attempts, 11);
    }

    #[test]
    fn test_exactly_accept_score_is_only_good() {
        let mut p = sampling();
        let out = p.observe(vec![face(0.99, 0.0)]);
        assert_eq!(out.verdict, Verdict::Continue);
        assert_eq!(p.state().good_samples, 1);
    }

    #[test]
    fn test_good_samples_survive_bad_samples() {
        let mut p = sampling();
        for _ in 0..6 {
            p.observe(vec![face(0.92, 0.0)]);
        }
        p.observe(vec![]);
        p.observe(vec![face(0.5, 0.0)]);
        for _ in 0..4 {
            assert_eq!(p.observe(vec![face(0.92, 0.0)]).verdict, Verdict::Continue);
        }
        assert!(matches!(
            p.observe(vec![face(0.92, 1.0)]).verdict,
            Verdict::Accept(_)
        ));
    }

    #[test]
    fn test_no_face_halves_percent_toward_zero() {
        let mut p = sampling();
        p.observe(vec![face(0.8, 0.0)]);
        let mut prev = p.state().percent;
        assert_eq!(prev, 80);
        for _ in 0..10 {
            let out = p.observe(vec![]);
            assert!(out.percent < prev || prev == 0);
            assert_eq!(out.percent, prev / 2);
            prev = out.percent;
        }
        assert_eq!(prev, 0);
    }

    #[test]
    fn test_multiple_faces_are_rejected() {
        let mut p = sampling();
        p.observe(vec![face(0.6, 0.0)]);
        let out = p.observe(vec![face(0.999, 1.0), face(0.999, 2.0)]);
        assert_eq!(out.verdict, Verdict::Continue);
        assert_eq!(out.percent, 30);
        assert_eq!(p.state().good_samples, 0);
    }

    #[test]
    fn test_warns_every_fiftieth_attempt() {
        let mut p = sampling();
        let mut warned = Vec::new();
        for _ in 0..300 {
            if p.observe(vec![]).warn {
                warned.push(p.state().attempts);
            }
        }
        assert_eq!(warned, vec![50, 100, 150, 200, 250, 300]);
    }

    #[test]
    fn test_abandons_once_ceiling_exceeded() {
        let mut p = sampling();
        for _ in 0..300 {
            assert_eq!(p.observe(vec![]).verdict, Verdict::Continue);
        }
        let out = p.observe(vec![face(0.999, 0.0)]);
        assert_eq!(out.verdict, Verdict::Abandon);
        assert!(!out.warn);
        assert_eq!(p.phase(), Phase::Abandoned);

        // Terminal: later samples change nothing.
        let out = p.observe(vec![face(0.999, 0.0)]);
        assert_eq!(out.verdict, Verdict::Continue);
        assert_eq!(p.state().attempts, 301);
    }

    #[test]
    fn test_observe_ignored_when_idle() {
        let mut p = Poller::new(AcceptancePolicy::default());
        let out = p.observe(vec![face(0.999, 0.0)]);
        assert_eq!(out.verdict, Verdict::Continue);
        assert_eq!(p.state(), PollState::default());
    }

    #[test]
    fn test_stop_and_reset() {
        let mut p = sampling();
        p.observe(vec![face(0.95, 0.0)]);
        p.stop();
        assert_eq!(p.phase(), Phase::Idle);
        assert_eq!(p.state().attempts, 1);
        assert!(p.start());
        assert!(!p.start());

        p.reset();
        assert_eq!(p.state(), PollState::default());
        assert_eq!(p.phase(), Phase::Idle);
    }

    #[test]
    fn test_terminal_phase_blocks_start_until_reset() {
        let mut p = sampling();
        p.observe(vec![face(0.999, 0.0)]);
        p.stop();
        assert_eq!(p.phase(), Phase::Accepted);
        assert!(!p.start());
        p.reset();
        assert!(p.start());
    }

    #[test]
    fn test_custom_policy() {
        let mut p = Poller::new(AcceptancePolicy {
            good_samples: 1,
            warn_every: 0,
            max_attempts: 3,
            ..AcceptancePolicy::default()
        });
        p.start();
        assert!(!p.observe(vec![face(0.91, 0.0)]).warn);
        assert!(matches!(
            p.observe(vec![face(0.91, 0.0)]).verdict,
            Verdict::Accept(_)
        ));
    }

    #[test]
    fn test_score_percent_clamps() {
        assert_eq!(score_percent(1.7), 100);
        assert_eq!(score_percent(-0.2), 0);
        assert_eq!(score_percent(0.456), 46);
        assert_eq!(score_percent(f32::NAN), 0);
    }
}
