use super::state::PAGE_SIZES;
use super::CsvUploaderApp;
use crate::students::{numeric_filter, SortColumn, SortOrder};
use crate::utils::file_size::format_size;
use egui::{Color32, RichText};
use rfd::FileDialog;

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const SUCCESS: Color32 = Color32::from_rgb(0, 180, 0);
const ERROR: Color32 = Color32::from_rgb(220, 50, 50);

fn progress_bar(ui: &mut egui::Ui, label: &str, percent: u8) {
    ui.horizontal(|ui| {
        ui.add_sized([180.0, 18.0], egui::Label::new(label));
        let bar = egui::ProgressBar::new(percent as f32 / 100.0)
            .text(format!("{}%", percent))
            .animate(false)
            .fill(ACCENT);
        ui.add(bar);
    });
}

impl CsvUploaderApp {
    pub fn render(&mut self, ctx: &egui::Context) {
        self.render_alert(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(20.0);
                ui.vertical_centered(|ui| {
                    ui.heading("CSV Uploader");
                    ui.add_space(5.0);
                    ui.label(
                        RichText::new(format!("Server: {}", self.config.server_url))
                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                    );
                });

                ui.add_space(20.0);
                self.render_upload_box(ui);

                if self.state.show_progress && !self.store.is_empty() {
                    ui.add_space(20.0);
                    self.render_progress(ui);
                }

                if !self.store.completed().is_empty() {
                    ui.add_space(10.0);
                    self.render_uploaded_files(ui);
                }

                self.render_error_banner(ui);

                ui.add_space(20.0);
                self.render_students(ui);
                ui.add_space(20.0);
            });
        });
    }

    fn render_alert(&mut self, ctx: &egui::Context) {
        let Some(alert) = self.state.alert.clone() else {
            return;
        };

        egui::Window::new("Invalid selection")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(alert);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    self.state.alert = None;
                }
            });
    }

    fn render_upload_box(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.vertical_centered(|ui| {
                ui.label("Upload your CSV files");
                ui.add_space(8.0);

                let icon = egui::Button::new(RichText::new("📤").size(36.0))
                    .min_size(egui::vec2(80.0, 80.0));
                if ui.add(icon).on_hover_text("Select CSV files").clicked() {
                    if let Some(paths) = FileDialog::new().add_filter("CSV", &["csv"]).pick_files() {
                        self.select_files(paths);
                    }
                }
            });
        });
    }

    fn render_progress(&self, ui: &mut egui::Ui) {
        let totals = self.store.totals();

        ui.group(|ui| {
            ui.heading("Total Progress");
            progress_bar(ui, "Total Upload Progress:", totals.upload);
            progress_bar(ui, "Total Processing Progress:", totals.processing);

            ui.add_space(10.0);
            ui.heading("Individual File Progress");

            for file in self.store.files() {
                let entry = self.store.entry(&file.name).copied().unwrap_or_default();
                ui.add_space(6.0);

                let title = format!("{} - {}", file.name, format_size(file.size));
                if file.completed {
                    ui.horizontal(|ui| {
                        ui.label("✅");
                        ui.colored_label(SUCCESS, format!("{} (Completed)", title));
                    });
                } else {
                    ui.label(title);
                }

                progress_bar(ui, "Upload Progress:", entry.upload_progress);
                progress_bar(ui, "Processing Progress:", entry.processing_progress);
            }
        });
    }

    fn render_uploaded_files(&self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.heading("Uploaded Files");
            for file in self.store.completed() {
                ui.horizontal(|ui| {
                    ui.label("📄");
                    ui.label(format!("{} ({})", file.name, file.size));
                });
            }
        });
    }

    fn render_error_banner(&mut self, ui: &mut egui::Ui) {
        let Some(error) = self.state.error_message.clone() else {
            return;
        };

        ui.add_space(10.0);
        egui::Frame::none()
            .fill(ui.style().visuals.extreme_bg_color)
            .stroke(egui::Stroke::new(1.0, ERROR))
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(ERROR, error);
                    if ui.button("Dismiss").clicked() {
                        self.state.error_message = None;
                    }
                });
            });
    }

    fn render_students(&mut self, ui: &mut egui::Ui) {
        ui.heading("Students Data");
        ui.add_space(8.0);

        let query = &mut self.state.query;
        ui.horizontal_wrapped(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut query.student_name)
                    .hint_text("Filter by student name")
                    .desired_width(170.0),
            );
            ui.add(
                egui::TextEdit::singleline(&mut query.subject)
                    .hint_text("Filter by subject")
                    .desired_width(140.0),
            );
            ui.add(
                egui::TextEdit::singleline(&mut query.grade_min)
                    .hint_text("Min grade")
                    .desired_width(80.0),
            );
            ui.add(
                egui::TextEdit::singleline(&mut query.grade_max)
                    .hint_text("Max grade")
                    .desired_width(80.0),
            );
        });
        // Grade filters behave like number inputs
        query.grade_min = numeric_filter(&query.grade_min);
        query.grade_max = numeric_filter(&query.grade_max);

        ui.add_space(8.0);

        let mut clicked = None;
        egui::Grid::new("students_table")
            .striped(true)
            .num_columns(SortColumn::ALL.len())
            .min_col_width(120.0)
            .show(ui, |ui| {
                for column in SortColumn::ALL {
                    let mut title = column.label().to_string();
                    if self.state.query.sort_by == column {
                        title.push_str(match self.state.query.sort_order {
                            SortOrder::Asc => " ▲",
                            SortOrder::Desc => " ▼",
                        });
                    }
                    let header = egui::Button::new(RichText::new(title).strong()).frame(false);
                    if ui.add(header).clicked() {
                        clicked = Some(column);
                    }
                }
                ui.end_row();

                for student in &self.state.students {
                    ui.label(student.student_id.as_str());
                    ui.label(student.student_name.as_str());
                    ui.label(student.subject.as_str());
                    ui.label(student.grade.to_string());
                    ui.end_row();
                }
            });

        if let Some(column) = clicked {
            self.state.query.sort_by_column(column);
        }

        if self.state.students.is_empty() {
            ui.label(RichText::new("No records found").italics());
        }

        ui.add_space(8.0);
        self.render_pagination(ui);
    }

    fn render_pagination(&mut self, ui: &mut egui::Ui) {
        let total_pages = self.state.total_pages;
        let total_records = self.state.total_records;
        let query = &mut self.state.query;

        ui.horizontal(|ui| {
            if ui
                .add_enabled(query.can_go_previous(), egui::Button::new("Previous"))
                .clicked()
            {
                query.previous_page();
            }

            ui.label(format!("Page {} of {}", query.page, total_pages));

            if ui
                .add_enabled(query.can_go_next(total_pages), egui::Button::new("Next"))
                .clicked()
            {
                query.next_page(total_pages);
            }

            ui.add_space(20.0);
            let mut limit = query.limit;
            egui::ComboBox::from_id_source("page_size")
                .selected_text(format!("{} rows", limit))
                .show_ui(ui, |ui| {
                    for size in PAGE_SIZES {
                        ui.selectable_value(&mut limit, size, size.to_string());
                    }
                });
            query.set_limit(limit);

            if let Some(total) = total_records {
                ui.label(format!("{} records", total));
            }
        });
    }
}
