mod api;
mod assistant;
mod chat;
mod config;
mod export;
mod models;
mod sources;
mod toast;
mod views;

use iced::{
    time,
    widget::{column, container, image, row, text_input},
    window, Element, Length, Subscription, Task, Theme,
};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use api::{ApiClient, ApiError};
use chat::ChatMessage;
use models::{AssistantResponse, ChatHistoryResponse, Source};
use toast::Toasts;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("question_images=info")),
        )
        .init();

    let config = config::Config::load();
    let window = window::Settings {
        size: iced::Size::new(config.window.width as f32, config.window.height as f32),
        min_size: Some(iced::Size::new(
            config.window.min_width as f32,
            config.window.min_height as f32,
        )),
        position: window::Position::Centered,
        ..Default::default()
    };

    iced::application("Question Images", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window)
        .run_with(move || App::new(config))?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Questions,
    Sources,
}

#[derive(Debug, Clone)]
enum Message {
    SourcesLoaded(Result<Vec<Source>, String>),
    SelectTab(Tab),
    SelectSource(String),
    NewSourceNameChanged(String),
    CreateSource,
    SourceCreated(Result<Source, String>),
    SourceLoaded { name: String, result: Result<Source, String> },
    ToggleImage(String),
    ThumbnailLoaded { name: String, image: String, result: Result<Vec<u8>, String> },
    PickUploads,
    UploadsPicked(Vec<PathBuf>),
    UploadFinished { name: String, result: Result<(), String> },
    DeleteSelectedImages,
    DeleteImagesConfirmed { name: String, images: Vec<String>, confirmed: bool },
    ImagesDeleted { name: String, result: Result<(), String> },
    DeleteSource,
    DeleteSourceConfirmed { name: String, confirmed: bool },
    SourceDeleted { name: String, result: Result<(), String> },
    HistoryLoaded { name: String, result: Result<ChatHistoryResponse, String> },
    InputChanged(String),
    PickAttachments,
    AttachmentsPicked(Vec<PathBuf>),
    RemoveAttachment(usize),
    Submit,
    AskFinished { name: String, result: Result<AssistantResponse, String> },
    ClearHistory,
    HistoryCleared { name: String, result: Result<String, String> },
    DownloadPdf(usize),
    DismissToast(usize),
    Tick,
}

/// State of the image manager for the selected source.
#[derive(Default)]
struct Manager {
    source: Option<Source>,
    loading: bool,
    busy: bool,
    selected_images: BTreeSet<String>,
    thumbnails: HashMap<String, image::Handle>,
}

/// State of the question chat for the selected source.
struct Conversation {
    /// `None` while history is loading.
    messages: Option<Vec<ChatMessage>>,
    input: String,
    staged: Vec<PathBuf>,
    loading: bool,
    input_id: text_input::Id,
}

struct App {
    api: ApiClient,
    export_dir: PathBuf,
    sources: Vec<Source>,
    sources_loading: bool,
    selected: Option<String>,
    tab: Tab,
    new_source_name: String,
    creating_source: bool,
    manager: Manager,
    conversation: Conversation,
    toasts: Toasts,
    loading_frame: usize,
}

/// Run an API future and hand its result, error rendered, to `f`.
fn perform<T, F, M>(future: F, f: M) -> Task<Message>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
    M: Fn(Result<T, String>) -> Message + Send + 'static,
{
    Task::perform(async move { future.await.map_err(|e| e.to_string()) }, f)
}

async fn pick_images(title: &str, extensions: &[&str]) -> Vec<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title(title)
        .add_filter("Images", extensions)
        .pick_files()
        .await
        .map(|files| files.iter().map(|file| file.path().to_path_buf()).collect())
        .unwrap_or_default()
}

/// Ask a yes/no question in a native dialog.
async fn confirm(title: &str, description: String) -> bool {
    let answer = rfd::AsyncMessageDialog::new()
        .set_level(rfd::MessageLevel::Warning)
        .set_title(title)
        .set_description(description)
        .set_buttons(rfd::MessageButtons::YesNo)
        .show()
        .await;
    matches!(answer, rfd::MessageDialogResult::Yes)
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl App {
    fn new(config: config::Config) -> (Self, Task<Message>) {
        let api = ApiClient::new(config.api.base_url);
        tracing::info!(base_url = %api.base_url(), "starting question-images");
        let input_id = text_input::Id::unique();

        let app = App {
            api: api.clone(),
            export_dir: config.export.directory,
            sources: Vec::new(),
            sources_loading: true,
            selected: None,
            tab: Tab::Questions,
            new_source_name: String::new(),
            creating_source: false,
            manager: Manager::default(),
            conversation: Conversation {
                messages: None,
                input: String::new(),
                staged: Vec::new(),
                loading: false,
                input_id,
            },
            toasts: Toasts::default(),
            loading_frame: 0,
        };

        let load = perform(async move { sources::fetch_sources(&api).await }, Message::SourcesLoaded);
        (app, load)
    }

    fn is_selected(&self, name: &str) -> bool {
        self.selected.as_deref() == Some(name)
    }

    fn load_source(&mut self, name: String) -> Task<Message> {
        self.manager.loading = true;
        let api = self.api.clone();
        let key = name.clone();
        perform(
            async move { sources::fetch_source(&api, &name).await },
            move |result| Message::SourceLoaded { name: key.clone(), result },
        )
    }

    fn load_history(&mut self, name: String) -> Task<Message> {
        let api = self.api.clone();
        let key = name.clone();
        perform(
            async move { assistant::history(&api, &name).await },
            move |result| Message::HistoryLoaded { name: key.clone(), result },
        )
    }

    /// Fetch thumbnails for images not cached yet.
    fn load_thumbnails(&mut self, source: &Source) -> Task<Message> {
        self.manager.thumbnails.retain(|image, _| source.images.contains(image));

        let tasks = source
            .images
            .iter()
            .filter(|image| !self.manager.thumbnails.contains_key(*image))
            .map(|image| {
                let api = self.api.clone();
                let name = source.name.clone();
                let image = image.clone();
                let (key, file) = (name.clone(), image.clone());
                perform(
                    async move { sources::fetch_image(&api, &name, &image).await },
                    move |result| Message::ThumbnailLoaded {
                        name: key.clone(),
                        image: file.clone(),
                        result,
                    },
                )
            })
            .collect::<Vec<_>>();
        Task::batch(tasks)
    }

    fn reload_sources(&mut self) -> Task<Message> {
        let api = self.api.clone();
        perform(async move { sources::fetch_sources(&api).await }, Message::SourcesLoaded)
    }

    fn select(&mut self, name: String) -> Task<Message> {
        tracing::debug!(source = %name, "selected source");
        self.selected = Some(name.clone());
        self.manager = Manager::default();
        self.conversation.messages = None;
        self.conversation.loading = false;

        Task::batch([
            self.load_source(name.clone()),
            self.load_history(name),
            text_input::focus(self.conversation.input_id.clone()),
        ])
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SourcesLoaded(result) => {
                self.sources_loading = false;
                match result {
                    Ok(sources) => {
                        self.sources = sources;
                        if self.selected.is_none() {
                            if let Some(first) = self.sources.first().map(|source| source.name.clone()) {
                                return self.select(first);
                            }
                        }
                    }
                    Err(e) => self.toasts.error(e),
                }
                Task::none()
            }
            Message::SelectTab(tab) => {
                self.tab = tab;
                Task::none()
            }
            Message::SelectSource(name) => {
                if self.is_selected(&name) {
                    return Task::none();
                }
                self.select(name)
            }
            Message::NewSourceNameChanged(value) => {
                self.new_source_name = value;
                Task::none()
            }
            Message::CreateSource => {
                if self.creating_source {
                    return Task::none();
                }
                let name = self.new_source_name.trim().to_string();
                if name.is_empty() {
                    self.toasts.error("Source name cannot be empty");
                    return Task::none();
                }

                self.creating_source = true;
                let api = self.api.clone();
                perform(
                    async move { sources::create_source(&api, &name).await },
                    Message::SourceCreated,
                )
            }
            Message::SourceCreated(result) => {
                self.creating_source = false;
                match result {
                    Ok(source) => {
                        self.toasts.success(format!("Source \"{}\" created!", source.name));
                        self.new_source_name.clear();
                        let name = source.name.clone();
                        if !self.sources.iter().any(|s| s.name == name) {
                            self.sources.push(source);
                        }
                        if self.selected.is_none() {
                            return self.select(name);
                        }
                    }
                    Err(e) => self.toasts.error(e),
                }
                Task::none()
            }
            Message::SourceLoaded { name, result } => {
                if !self.is_selected(&name) {
                    return Task::none();
                }
                self.manager.loading = false;
                match result {
                    Ok(source) => {
                        if let Some(cached) = self.sources.iter_mut().find(|s| s.name == source.name) {
                            cached.images = source.images.clone();
                        }
                        self.manager.selected_images.clear();
                        let thumbnails = self.load_thumbnails(&source);
                        self.manager.source = Some(source);
                        thumbnails
                    }
                    Err(e) => {
                        self.toasts.error(e);
                        Task::none()
                    }
                }
            }
            Message::ThumbnailLoaded { name, image, result } => {
                if !self.is_selected(&name) {
                    return Task::none();
                }
                match result {
                    Ok(bytes) => {
                        self.manager.thumbnails.insert(image, image::Handle::from_bytes(bytes));
                    }
                    Err(e) => tracing::warn!(source = %name, %image, error = %e, "thumbnail unavailable"),
                }
                Task::none()
            }
            Message::ToggleImage(image) => {
                if !self.manager.selected_images.remove(&image) {
                    self.manager.selected_images.insert(image);
                }
                Task::none()
            }
            Message::PickUploads => {
                if self.selected.is_none() || self.manager.busy {
                    return Task::none();
                }
                Task::perform(
                    async { pick_images("Upload question images", &sources::SOURCE_EXTENSIONS).await },
                    Message::UploadsPicked,
                )
            }
            Message::UploadsPicked(paths) => {
                let Some(name) = self.selected.clone() else {
                    return Task::none();
                };
                if paths.is_empty() {
                    return Task::none();
                }

                self.manager.busy = true;
                self.toasts.info(format!("Uploading {} image(s)...", paths.len()));
                let api = self.api.clone();
                let key = name.clone();
                perform(
                    async move { sources::upload_images(&api, &name, &paths).await },
                    move |result| Message::UploadFinished { name: key.clone(), result },
                )
            }
            Message::UploadFinished { name, result } => {
                self.manager.busy = false;
                match result {
                    Ok(()) => self.toasts.success("Upload complete!"),
                    Err(e) => self.toasts.error(e),
                }
                if self.is_selected(&name) {
                    self.load_source(name)
                } else {
                    Task::none()
                }
            }
            Message::DeleteSelectedImages => {
                let Some(name) = self.selected.clone() else {
                    return Task::none();
                };
                if self.manager.selected_images.is_empty() || self.manager.busy {
                    return Task::none();
                }

                self.manager.busy = true;
                let images: Vec<String> = self.manager.selected_images.iter().cloned().collect();
                let prompt = sources::delete_images_prompt(images.len());
                Task::perform(async move { confirm("Delete images", prompt).await }, move |confirmed| {
                    Message::DeleteImagesConfirmed {
                        name: name.clone(),
                        images: images.clone(),
                        confirmed,
                    }
                })
            }
            Message::DeleteImagesConfirmed { name, images, confirmed } => {
                if !self.is_selected(&name) {
                    return Task::none();
                }
                if !confirmed {
                    self.manager.busy = false;
                    return Task::none();
                }

                self.toasts.info("Deleting selected images...");
                let api = self.api.clone();
                let key = name.clone();
                perform(
                    async move { sources::delete_images(&api, &name, &images).await },
                    move |result| Message::ImagesDeleted { name: key.clone(), result },
                )
            }
            Message::ImagesDeleted { name, result } => {
                self.manager.busy = false;
                match result {
                    Ok(()) => {
                        self.toasts.success("Images deleted successfully!");
                        self.manager.selected_images.clear();
                    }
                    Err(e) => self.toasts.error(e),
                }
                if self.is_selected(&name) {
                    self.load_source(name)
                } else {
                    Task::none()
                }
            }
            Message::DeleteSource => {
                let Some(name) = self.selected.clone() else {
                    return Task::none();
                };
                if self.manager.busy {
                    return Task::none();
                }

                self.manager.busy = true;
                let prompt = sources::delete_source_prompt(&name);
                Task::perform(async move { confirm("Delete source", prompt).await }, move |confirmed| {
                    Message::DeleteSourceConfirmed { name: name.clone(), confirmed }
                })
            }
            Message::DeleteSourceConfirmed { name, confirmed } => {
                if !self.is_selected(&name) {
                    return Task::none();
                }
                if !confirmed {
                    self.manager.busy = false;
                    return Task::none();
                }

                let api = self.api.clone();
                let key = name.clone();
                perform(
                    async move { sources::delete_source(&api, &name).await },
                    move |result| Message::SourceDeleted { name: key.clone(), result },
                )
            }
            Message::SourceDeleted { name, result } => {
                self.manager.busy = false;
                match result {
                    Ok(()) => {
                        self.toasts.success(format!("Source \"{}\" deleted", name));
                        self.sources.retain(|source| source.name != name);
                        if self.is_selected(&name) {
                            self.selected = None;
                            self.manager = Manager::default();
                            self.conversation.messages = None;
                            if let Some(first) = self.sources.first().map(|s| s.name.clone()) {
                                return self.select(first);
                            }
                        }
                        Task::none()
                    }
                    Err(e) => {
                        self.toasts.error(e);
                        self.reload_sources()
                    }
                }
            }
            Message::HistoryLoaded { name, result } => {
                if !self.is_selected(&name) {
                    return Task::none();
                }
                self.conversation.loading = false;
                match result {
                    Ok(history) => {
                        tracing::debug!(source = %name, exchanges = history.total_exchanges, "loaded history");
                        self.conversation.messages =
                            Some(chat::from_history(&history.history, chrono::Local::now()));
                    }
                    Err(e) => {
                        tracing::error!(source = %name, error = %e, "failed to load chat history");
                        self.conversation.messages = Some(Vec::new());
                    }
                }
                Task::none()
            }
            Message::InputChanged(value) => {
                self.conversation.input = value;
                Task::none()
            }
            Message::PickAttachments => {
                if self.conversation.loading {
                    return Task::none();
                }
                Task::perform(
                    async { pick_images("Attach question images", &assistant::ASK_EXTENSIONS).await },
                    Message::AttachmentsPicked,
                )
            }
            Message::AttachmentsPicked(paths) => {
                let mut staged = self.conversation.staged.clone();
                staged.extend(paths);
                match assistant::validate_attachments(&staged) {
                    Ok(()) => self.conversation.staged = staged,
                    Err(e) => self.toasts.error(e.to_string()),
                }
                Task::none()
            }
            Message::RemoveAttachment(index) => {
                if index < self.conversation.staged.len() {
                    self.conversation.staged.remove(index);
                }
                Task::none()
            }
            Message::Submit => {
                let Some(name) = self.selected.clone() else {
                    return Task::none();
                };
                let conversation = &mut self.conversation;
                if (conversation.input.trim().is_empty() && conversation.staged.is_empty())
                    || conversation.loading
                {
                    return Task::none();
                }
                let Some(messages) = conversation.messages.as_mut() else {
                    return Task::none();
                };

                let text = std::mem::take(&mut conversation.input);
                let files = std::mem::take(&mut conversation.staged);
                let images = files.iter().map(|path| file_name(path)).collect();
                messages.push(ChatMessage::user(text.clone(), images, chrono::Local::now()));
                conversation.loading = true;

                let api = self.api.clone();
                let key = name.clone();
                perform(
                    async move { assistant::ask(&api, &name, &text, &files).await },
                    move |result| Message::AskFinished { name: key.clone(), result },
                )
            }
            Message::AskFinished { name, result } => {
                if !self.is_selected(&name) {
                    return Task::none();
                }
                let now = chrono::Local::now();
                match result {
                    Ok(response) => {
                        if let Some(messages) = self.conversation.messages.as_mut() {
                            messages.push(ChatMessage::from_response(&response, now));
                        }
                        // Loading ends once history has been reloaded.
                        self.load_history(name)
                    }
                    Err(e) => {
                        if let Some(messages) = self.conversation.messages.as_mut() {
                            messages.push(ChatMessage::error(&e, now));
                        }
                        self.conversation.loading = false;
                        Task::none()
                    }
                }
            }
            Message::ClearHistory => {
                let Some(name) = self.selected.clone() else {
                    return Task::none();
                };
                if self.conversation.loading {
                    return Task::none();
                }
                let api = self.api.clone();
                let key = name.clone();
                perform(
                    async move { assistant::clear_history(&api, &name).await },
                    move |result| Message::HistoryCleared { name: key.clone(), result },
                )
            }
            Message::HistoryCleared { name, result } => {
                match result {
                    Ok(message) => {
                        self.toasts.success(message);
                        if self.is_selected(&name) {
                            self.conversation.messages = Some(Vec::new());
                        }
                    }
                    Err(e) => self.toasts.error(format!("Failed to clear chat history: {}", e)),
                }
                Task::none()
            }
            Message::DownloadPdf(index) => {
                let content = self
                    .conversation
                    .messages
                    .as_ref()
                    .and_then(|messages| messages.get(index))
                    .map(|message| message.content.clone());

                if let Some(content) = content {
                    match export::export_message(&content, index, &self.export_dir) {
                        Ok(path) => self.toasts.success(format!("Saved {}", path.display())),
                        Err(e) => self.toasts.error(e.to_string()),
                    }
                }
                Task::none()
            }
            Message::DismissToast(index) => {
                self.toasts.dismiss(index);
                Task::none()
            }
            Message::Tick => {
                self.toasts.expire(Instant::now());
                if self.is_busy() {
                    self.loading_frame = (self.loading_frame + 1) % views::SPINNER.len();
                }
                Task::none()
            }
        }
    }

    fn is_busy(&self) -> bool {
        self.sources_loading
            || self.manager.loading
            || self.conversation.loading
            || (self.selected.is_some() && self.conversation.messages.is_none())
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.is_busy() || !self.toasts.is_empty() {
            time::every(Duration::from_millis(100)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn view(&self) -> Element<Message> {
        let main: Element<Message> = match self.tab {
            Tab::Questions => views::chat::view(self),
            Tab::Sources => views::sources::view(self),
        };

        let content = column![views::toasts(&self.toasts), main]
            .spacing(10)
            .padding(10)
            .width(Length::Fill)
            .height(Length::Fill);

        container(row![views::sidebar::view(self), content])
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNight
    }
}
