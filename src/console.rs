//! Terminal stand-in for the operator panel: one input field, a send
//! trigger, a power-off trigger, an exit trigger, and two status lines.

use crate::constants::POWER_OFF_CONFIRMATION;
use crate::controller::{Controller, ControllerError};
use crate::types::{Notice, NoticeLevel};
use colored::Colorize;
use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Trigger {
    Send,
    PowerOff,
    Exit,
}

/// Map one line typed by the operator to a trigger, plus the text that goes
/// into the input field for `Send`.
pub fn classify_input(line: &str) -> (Trigger, Option<&str>) {
    match line {
        "off" => (Trigger::PowerOff, None),
        "exit" | "quit" => (Trigger::Exit, None),
        text => (Trigger::Send, Some(text)),
    }
}

pub fn render_notice(notice: &Notice) -> String {
    let title = format!("[{}]", notice.level);
    let title = match notice.level {
        NoticeLevel::Info => title.cyan().bold(),
        NoticeLevel::Warning => title.yellow().bold(),
        NoticeLevel::Error => title.red().bold(),
    };
    format!("{} {}", title, notice.message)
}

pub struct Console {
    controller: Controller,
    entry: String,
}

impl Console {
    pub fn new(controller: Controller) -> Self {
        Console {
            controller,
            entry: String::new(),
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn set_entry(&mut self, text: &str) {
        self.entry = text.to_string();
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Send whatever is in the input field. The field is cleared only when
    /// the command went out.
    pub async fn send(&mut self) -> Option<Notice> {
        match self.controller.submit(&self.entry).await {
            Ok(outcome) => {
                self.entry.clear();
                outcome.notice()
            }
            Err(ControllerError::Rejected { .. }) => Some(Notice::warning(format!(
                "Por favor, insira um valor válido ({}).",
                self.controller.config().allow_list.join(", ")
            ))),
            Err(e) => Some(Notice::error(format!("Erro ao enviar dados: {}", e))),
        }
    }

    pub async fn power_off(&self) -> Notice {
        match self.controller.power_off().await {
            Ok(()) => Notice::info(POWER_OFF_CONFIRMATION),
            Err(e) => Notice::error(format!("Erro ao enviar comando OFF: {}", e)),
        }
    }

    fn print_status(&self) {
        let state = self.controller.state();
        let telemetry = state
            .telemetry
            .map(|r| r.to_string())
            .unwrap_or_else(|| "--".to_string());
        println!("{}  |  ADC: {}", state.angle.label().green(), telemetry);
    }

    /// Drive the panel from `input` until an exit trigger or end of input,
    /// then shut the controller down.
    pub async fn run<R>(mut self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut telemetry = self.controller.subscribe_telemetry();

        println!("{}", "FAN-PLATE".white().bold());
        println!(
            "Angles: {}  |  'off' to power off, 'exit' to quit",
            self.controller.config().allow_list.join(", ")
        );
        self.print_status();

        let result = loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => break Ok(()),
                        Err(e) => break Err(e),
                    };

                    let (trigger, text) = classify_input(&line);
                    debug!("Trigger {:?}", trigger);
                    let notice = match trigger {
                        Trigger::Send => {
                            self.set_entry(text.unwrap_or_default());
                            self.send().await
                        }
                        Trigger::PowerOff => Some(self.power_off().await),
                        Trigger::Exit => break Ok(()),
                    };

                    if let Some(notice) = notice {
                        println!("{}", render_notice(&notice));
                    }
                    self.print_status();
                }
                changed = telemetry.changed() => {
                    if changed.is_err() {
                        continue;
                    }
                    if let Some(reading) = *telemetry.borrow_and_update() {
                        println!("ADC: {}", reading);
                    }
                }
            }
        };

        self.controller.shutdown().await;
        result
    }
}
