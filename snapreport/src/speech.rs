//! Read-aloud playback control
//!
//! A small state machine over a pluggable speech engine. Playback is
//! always in exactly one of three states; invalid transitions are ignored
//! rather than erroring, so stray UI events cannot wedge the controller.

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    Idle,
    Playing,
    Paused,
}

/// Backend that actually produces audio.
pub trait SpeechEngine {
    /// Begin speaking `text` from the start.
    fn speak(&mut self, text: &str);
    fn pause(&mut self);
    fn resume(&mut self);
    /// Stop and discard any queued utterance.
    fn cancel(&mut self);
}

/// State machine driving a [`SpeechEngine`].
pub struct SpeechController<E> {
    engine: E,
    state: SpeechState,
}

impl<E: SpeechEngine> SpeechController<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: SpeechState::Idle,
        }
    }

    pub fn state(&self) -> SpeechState {
        self.state
    }

    /// Start reading `text` from the beginning. Restarting while playing
    /// or paused cancels the current utterance first.
    pub fn start(&mut self, text: &str) {
        if self.state != SpeechState::Idle {
            self.engine.cancel();
        }
        self.engine.speak(text);
        self.state = SpeechState::Playing;
        log::debug!("speech started");
    }

    /// Pause playback. Only valid while playing.
    pub fn pause(&mut self) {
        if self.state == SpeechState::Playing {
            self.engine.pause();
            self.state = SpeechState::Paused;
        }
    }

    /// Resume playback. Only valid while paused.
    pub fn resume(&mut self) {
        if self.state == SpeechState::Paused {
            self.engine.resume();
            self.state = SpeechState::Playing;
        }
    }

    /// Stop playback and return to idle.
    pub fn stop(&mut self) {
        if self.state != SpeechState::Idle {
            self.engine.cancel();
            self.state = SpeechState::Idle;
        }
    }

    /// Notification from the engine that the utterance finished on its own.
    pub fn on_playback_complete(&mut self) {
        self.state = SpeechState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockEngine {
        spoken: Vec<String>,
        pauses: usize,
        resumes: usize,
        cancels: usize,
    }

    impl SpeechEngine for MockEngine {
        fn speak(&mut self, text: &str) {
            self.spoken.push(text.to_string());
        }
        fn pause(&mut self) {
            self.pauses += 1;
        }
        fn resume(&mut self) {
            self.resumes += 1;
        }
        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    #[test]
    fn test_start_pause_resume_stop_cycle() {
        let mut controller = SpeechController::new(MockEngine::default());
        assert_eq!(controller.state(), SpeechState::Idle);

        controller.start("hello");
        assert_eq!(controller.state(), SpeechState::Playing);

        controller.pause();
        assert_eq!(controller.state(), SpeechState::Paused);

        controller.resume();
        assert_eq!(controller.state(), SpeechState::Playing);

        controller.stop();
        assert_eq!(controller.state(), SpeechState::Idle);
        assert_eq!(controller.engine.cancels, 1);
    }

    #[test]
    fn test_invalid_transitions_are_ignored() {
        let mut controller = SpeechController::new(MockEngine::default());

        // Pause and resume from idle do nothing.
        controller.pause();
        controller.resume();
        assert_eq!(controller.state(), SpeechState::Idle);
        assert_eq!(controller.engine.pauses, 0);
        assert_eq!(controller.engine.resumes, 0);

        // Resume while playing does nothing.
        controller.start("hello");
        controller.resume();
        assert_eq!(controller.state(), SpeechState::Playing);
        assert_eq!(controller.engine.resumes, 0);

        // Pause while paused does nothing.
        controller.pause();
        controller.pause();
        assert_eq!(controller.engine.pauses, 1);
    }

    #[test]
    fn test_restart_cancels_current_utterance() {
        let mut controller = SpeechController::new(MockEngine::default());
        controller.start("first");
        controller.start("second");
        assert_eq!(controller.engine.cancels, 1);
        assert_eq!(controller.engine.spoken, vec!["first", "second"]);
        assert_eq!(controller.state(), SpeechState::Playing);
    }

    #[test]
    fn test_completion_returns_to_idle() {
        let mut controller = SpeechController::new(MockEngine::default());
        controller.start("hello");
        controller.on_playback_complete();
        assert_eq!(controller.state(), SpeechState::Idle);
        // Natural completion never cancels.
        assert_eq!(controller.engine.cancels, 0);
    }

    #[test]
    fn test_stop_from_idle_is_noop() {
        let mut controller = SpeechController::new(MockEngine::default());
        controller.stop();
        assert_eq!(controller.engine.cancels, 0);
    }
}
