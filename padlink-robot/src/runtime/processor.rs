use padlink_api::{Codec, Command};

use crate::control::LinkStatus;
use crate::hardware::Chassis;

use super::RobotRuntime;

impl<C: Chassis> RobotRuntime<C> {
    /// Decodes one complete frame and applies it. Undecodable frames are dropped.
    pub fn process_frame(&self, frame: &[u8]) {
        match Codec::decode(frame) {
            Ok(command) => self.process_command(command),
            Err(e) => tracing::debug!("Ignoring unexpected command: {}", e),
        }
    }

    pub fn process_command(&self, command: Command) {
        match command {
            Command::Event(event) => {
                self.set_status(LinkStatus::ProcessingCommand);
                let mut state = self.state.borrow_mut();
                self.policy.handle_event(&mut state, &event);
            }
            Command::ReadTimeout => {
                if self.status() != LinkStatus::WaitingForCommand {
                    tracing::debug!("No command within {:?}, stopping", self.read_timeout);
                }
                self.stop_movement();
                self.set_status(LinkStatus::WaitingForCommand);
            }
        }
    }
}
