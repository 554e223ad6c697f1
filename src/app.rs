use eframe::egui;
use std::sync::{Arc, mpsc};
use tokio::runtime::Runtime;

use crate::client::ChatBackend;
use crate::client::api::LangGraphClient;
use crate::config::{AppConfig, ChatDensity, FontSizePreset};
use crate::controller::{self, IndicatorState, StatusIndicator, TurnEvent, TurnFold};
use crate::error::startup::StartupError;
use crate::registry::SessionState;
use crate::types::messages::{DisplayMessage, Role};

pub struct ChatApp {
    session: SessionState,
    backend: Arc<dyn ChatBackend>,

    // Async runtime + UI channel
    runtime: Arc<Runtime>,
    ui_rx: mpsc::Receiver<UiMsg>,
    ui_tx: mpsc::Sender<UiMsg>,

    // Current turn, and what is left of the previous one
    turn: Option<TurnFold>,
    last_status: Option<StatusIndicator>,
    turn_error: Option<String>,
    input: String,

    config: AppConfig,
    commonmark_cache: egui_commonmark::CommonMarkCache,
}

enum UiMsg {
    Turn(TurnEvent),
}

/// Index of the reply a finished turn's status indicator sits above: the last
/// message, when the assistant wrote it.
pub(crate) fn status_anchor(history: &[DisplayMessage]) -> Option<usize> {
    match history.last() {
        Some(msg) if msg.role == Role::Assistant => Some(history.len() - 1),
        _ => None,
    }
}

impl ChatApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Result<Self, StartupError> {
        // Image loaders back the emoji in the tool status header
        egui_extras::install_image_loaders(&cc.egui_ctx);
        config.ui.apply_to_context(&cc.egui_ctx);

        let runtime = Arc::new(Runtime::new()?);
        let client = LangGraphClient::new(&config.server.base_url, &config.server.assistant_id)?
            .with_thread_page_size(config.server.thread_page_size);
        tracing::info!(base_url = client.base_url(), assistant = %client.assistant_id, "connecting to agent server");
        let backend: Arc<dyn ChatBackend> = Arc::new(client);

        let mut session = SessionState::new();
        runtime.block_on(controller::initialize(&mut session, backend.as_ref()));

        let (ui_tx, ui_rx) = mpsc::channel();
        Ok(Self {
            session,
            backend,
            runtime,
            ui_rx,
            ui_tx,
            turn: None,
            last_status: None,
            turn_error: None,
            input: String::new(),
            config,
            commonmark_cache: egui_commonmark::CommonMarkCache::default(),
        })
    }

    fn busy(&self) -> bool {
        self.turn.is_some()
    }

    /// Drain turn events forwarded by the streaming task.
    fn drain_ui_msgs(&mut self) {
        while let Ok(msg) = self.ui_rx.try_recv() {
            match msg {
                UiMsg::Turn(event) => self.apply_turn_event(event),
            }
        }
    }

    fn apply_turn_event(&mut self, event: TurnEvent) {
        let Some(fold) = self.turn.as_mut() else {
            return;
        };
        fold.apply(event);
        if !fold.is_finished() {
            return;
        }
        if let Some(fold) = self.turn.take() {
            if let controller::TurnPhase::Failed(reason) = &fold.phase {
                self.turn_error = Some(reason.clone());
            }
            self.last_status = controller::append_turn(&mut self.session, fold);
        }
    }

    fn action_new_chat(&mut self) {
        self.session.reset_chat();
        self.last_status = None;
        self.turn_error = None;
    }

    fn action_select_thread(&mut self, thread_id: &str) {
        self.runtime.block_on(controller::select_thread(
            &mut self.session,
            self.backend.as_ref(),
            thread_id,
        ));
        self.last_status = None;
        self.turn_error = None;
    }

    fn action_send(&mut self, ctx: &egui::Context) {
        if self.busy() {
            return;
        }
        let text = std::mem::take(&mut self.input);
        let Some(request) = controller::submit_user_input(&mut self.session, &text) else {
            self.input = text;
            return;
        };

        self.turn = Some(TurnFold::new(request.thread_id.clone()));
        self.last_status = None;
        self.turn_error = None;

        let backend = Arc::clone(&self.backend);
        let tx = self.ui_tx.clone();
        let egui_ctx = ctx.clone();
        self.runtime.spawn(async move {
            controller::run_turn(backend.as_ref(), request, move |event| {
                let _ = tx.send(UiMsg::Turn(event));
                egui_ctx.request_repaint();
            })
            .await;
        });
    }

    fn apply_ui_preferences(&self, ctx: &egui::Context) {
        self.config.ui.apply_to_context(ctx);
        self.config.save();
    }

    fn render_message(&mut self, ui: &mut egui::Ui, msg: &DisplayMessage) {
        let available_width = ui.available_width();
        let bubble_max_width = available_width * 0.75;

        let (bg_color, align_right) = match msg.role {
            Role::User => (egui::Color32::from_rgb(60, 100, 180), true),
            Role::Assistant => (egui::Color32::from_rgb(70, 70, 70), false),
        };

        ui.add_space(8.0);

        ui.horizontal(|ui| {
            let layout = if align_right {
                egui::Layout::right_to_left(egui::Align::TOP)
            } else {
                egui::Layout::left_to_right(egui::Align::TOP)
            };
            ui.with_layout(layout, |ui| {
                egui::Frame::new()
                    .fill(bg_color)
                    .corner_radius(10)
                    .inner_margin(12.0)
                    .show(ui, |ui| {
                        ui.set_max_width(bubble_max_width);
                        if !msg.content.is_empty() {
                            egui_commonmark::CommonMarkViewer::new().show(
                                ui,
                                &mut self.commonmark_cache,
                                &msg.content,
                            );
                        }
                    });

                ui.add_space(6.0);

                if ui.button("Copy").clicked() {
                    ui.ctx().copy_text(msg.content.clone());
                }
            });
        });

        ui.add_space(4.0);
    }

    fn render_status(ui: &mut egui::Ui, status: &StatusIndicator, thread_id: &str) {
        let running = status.state == IndicatorState::Running;
        // Keyed by state so the completed indicator starts collapsed.
        let id = egui::Id::new(("turn_status", thread_id, running));

        egui::Frame::new()
            .fill(egui::Color32::from_rgb(45, 45, 45))
            .corner_radius(6)
            .inner_margin(6.0)
            .show(ui, |ui| {
                egui::collapsing_header::CollapsingState::load_with_default_open(
                    ui.ctx(),
                    id,
                    status.expanded,
                )
                .show_header(ui, |ui| {
                    if running {
                        ui.spinner();
                    }
                    egui_twemoji::EmojiLabel::new(&status.label).show(ui);
                })
                .body(|ui| {
                    for tool in &status.tools {
                        ui.label(egui::RichText::new(format!("• {tool}")).monospace().weak());
                    }
                });
            });
    }

    fn render_turn(&mut self, ui: &mut egui::Ui) {
        let Some(fold) = self.turn.clone() else {
            return;
        };
        ui.add_space(8.0);
        if let Some(status) = &fold.status {
            Self::render_status(ui, status, &fold.thread_id);
            ui.add_space(6.0);
        }
        if fold.text.is_empty() {
            if fold.status.is_none() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Thinking...");
                });
            }
        } else {
            self.render_message(ui, &DisplayMessage::assistant(fold.text));
        }
    }

    fn render_threads_pane(&mut self, ctx: &egui::Context) {
        let mut new_chat = false;
        let mut selected: Option<String> = None;
        let busy = self.busy();

        egui::SidePanel::left("threads_pane")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Chatbot");
                ui.add_space(4.0);

                ui.add_enabled_ui(!busy, |ui| {
                    if ui.button("New Chat").clicked() {
                        new_chat = true;
                    }

                    ui.add_space(8.0);
                    ui.label(egui::RichText::new("My Conversations").strong());
                    ui.separator();

                    egui::ScrollArea::vertical().show(ui, |ui| {
                        for (thread_id, title) in self.session.threads_newest_first() {
                            let is_active = self.session.is_active(thread_id);
                            if ui
                                .selectable_label(is_active, title)
                                .on_hover_text(thread_id)
                                .clicked()
                            {
                                selected = Some(thread_id.to_string());
                            }
                        }
                    });
                });
            });

        if new_chat {
            self.action_new_chat();
        }
        if let Some(thread_id) = selected {
            self.action_select_thread(&thread_id);
        }
    }

    fn render_view_bar(&mut self, ctx: &egui::Context) {
        let mut changed = false;

        egui::TopBottomPanel::top("view_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(self.session.title(&self.session.active_thread_id))
                        .strong(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    egui::ComboBox::from_id_salt("chat_density_selector")
                        .selected_text(format!("{:?}", self.config.ui.chat_density))
                        .show_ui(ui, |ui| {
                            for density in [
                                ChatDensity::Compact,
                                ChatDensity::Normal,
                                ChatDensity::Comfortable,
                            ] {
                                changed |= ui
                                    .selectable_value(
                                        &mut self.config.ui.chat_density,
                                        density,
                                        format!("{density:?}"),
                                    )
                                    .clicked();
                            }
                        });
                    egui::ComboBox::from_id_salt("font_size_selector")
                        .selected_text(format!("{:?}", self.config.ui.font_size))
                        .show_ui(ui, |ui| {
                            for preset in [
                                FontSizePreset::Small,
                                FontSizePreset::Standard,
                                FontSizePreset::Large,
                            ] {
                                changed |= ui
                                    .selectable_value(
                                        &mut self.config.ui.font_size,
                                        preset,
                                        format!("{preset:?}"),
                                    )
                                    .clicked();
                            }
                        });
                });
            });
        });

        if changed {
            self.apply_ui_preferences(ctx);
        }
    }

    fn render_input_panel(&mut self, ctx: &egui::Context) {
        let mut send = false;
        let busy = self.busy();

        egui::TopBottomPanel::bottom("input_panel")
            .resizable(true)
            .min_height(72.0)
            .default_height(72.0)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    let send_enabled = !busy && !self.input.trim().is_empty();
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                        ui.vertical(|ui| {
                            if ui
                                .add_enabled(send_enabled, egui::Button::new("Send"))
                                .clicked()
                            {
                                send = true;
                            }
                            ui.small("⌘+Enter");
                        });

                        let width = ui.available_width();
                        ui.add_enabled(
                            !busy,
                            egui::TextEdit::multiline(&mut self.input)
                                .hint_text("Type here")
                                .desired_width(width)
                                .desired_rows(3),
                        );
                    });

                    let send_key =
                        ui.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Enter));
                    if send_key && send_enabled {
                        send = true;
                    }
                });
            });

        if send {
            self.action_send(ctx);
        }
    }

    fn render_chat(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .stick_to_bottom(true)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let spacing = self.config.ui.chat_density.message_spacing();
                    let history = self.session.history.clone();
                    let anchor = if self.busy() {
                        None
                    } else {
                        self.last_status.as_ref().and_then(|_| status_anchor(&history))
                    };
                    for (index, msg) in history.iter().enumerate() {
                        if anchor == Some(index) {
                            if let Some(status) = &self.last_status {
                                ui.add_space(8.0);
                                Self::render_status(ui, status, &self.session.active_thread_id);
                            }
                        }
                        self.render_message(ui, msg);
                        ui.add_space(spacing);
                    }

                    if self.busy() {
                        self.render_turn(ui);
                    }

                    if let Some(error) = &self.turn_error {
                        ui.add_space(8.0);
                        ui.colored_label(egui::Color32::RED, format!("Turn failed: {error}"));
                    }
                });
        });
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_ui_msgs();

        self.render_threads_pane(ctx);
        self.render_view_bar(ctx);
        self.render_input_panel(ctx);
        self.render_chat(ctx);
    }
}
