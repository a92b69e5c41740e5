// API client module: typed calls over the service's form-encoded task
// endpoints. Every request goes through one transport so cookies set at
// login are sent with everything that follows.

use crate::config::Config;
use crate::error::{LanzouError, Result};
use crate::models::{Envelope, FileEntry, FolderEntry, Payload};
use crate::nav::FolderSource;
use crate::session::{probe_account_page, Probe, Session, SessionStore};
use crate::transport::{FormRequest, HttpReply, HttpTransport, Transport, UploadRequest};
use indicatif::ProgressBar;
use reqwest::Url;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Id of the drive root.
pub const ROOT_FOLDER_ID: &str = "-1";

/// Task codes understood by the shared endpoints.
mod task {
    pub const UPLOAD: &str = "1";
    pub const CREATE_FOLDER: &str = "2";
    pub const DELETE_FOLDER: &str = "3";
    pub const LOGIN: &str = "3";
    pub const LIST_FILES: &str = "5";
    pub const DELETE_FILE: &str = "6";
    pub const SHARE_LINK: &str = "22";
    pub const LIST_FOLDERS: &str = "47";
}

/// Resolved URLs for every endpoint the client talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Shared task endpoint (`/doupload.php`).
    pub tasks: String,
    /// Multipart upload endpoint (`/html5up.php`).
    pub upload: String,
    /// Account page used to probe the session (`/mydisk.php`).
    pub account: String,
    pub login: String,
    /// Scheme and host of the login endpoint, sent as Origin/Referer.
    pub login_origin: String,
}

impl Endpoints {
    pub fn new(base_url: &str, login_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let login_origin = Url::parse(login_url)
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_else(|_| login_url.to_string());
        Self {
            tasks: format!("{}/doupload.php", base),
            upload: format!("{}/html5up.php", base),
            account: format!("{}/mydisk.php", base),
            login: login_url.to_string(),
            login_origin,
        }
    }
}

/// Client for the Lanzou web API.
///
/// Holds the transport (and with it the cookie jar), the session flag and
/// the on-disk session store.
pub struct LanzouClient<T: Transport = HttpTransport> {
    transport: T,
    endpoints: Endpoints,
    session: Session,
    store: SessionStore,
}

impl LanzouClient<HttpTransport> {
    /// Build a client with a real HTTP transport from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(
            transport,
            Endpoints::new(&config.base_url, &config.login_url),
            SessionStore::new(&config.cookie_file),
        ))
    }
}

/// Check the HTTP status, parse the envelope and, unless exempt, the
/// outer status sentinel.
fn decode_envelope(reply: &HttpReply, check_status: bool) -> Result<Envelope> {
    if !reply.is_ok() {
        return Err(LanzouError::Http(reply.status));
    }
    let envelope: Envelope = serde_json::from_str(&reply.body)?;
    if check_status && !envelope.is_ok() {
        return Err(LanzouError::Service(envelope.message()));
    }
    Ok(envelope)
}

impl<T: Transport> LanzouClient<T> {
    pub fn with_transport(transport: T, endpoints: Endpoints, store: SessionStore) -> Self {
        Self {
            transport,
            endpoints,
            session: Session::default(),
            store,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fails with [`LanzouError::NotLoggedIn`] before any request is made.
    pub fn ensure_logged_in(&self) -> Result<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(LanzouError::NotLoggedIn)
        }
    }

    /// Send one task request to the shared endpoint and decode the reply.
    ///
    /// The folder listing task reuses `zt` for something other than success,
    /// so its replies skip the status check.
    fn send_and_decode(&self, code: &'static str, fields: Vec<(&'static str, String)>) -> Result<Envelope> {
        let mut form = Vec::with_capacity(fields.len() + 1);
        form.push(("task", code.to_string()));
        form.extend(fields);
        debug!(task = code, "sending task request");
        let reply = self
            .transport
            .post_form(FormRequest::new(&self.endpoints.tasks, form))?;
        decode_envelope(&reply, code != task::LIST_FOLDERS)
    }

    // ---------------------------------------------------------------------
    // Session
    // ---------------------------------------------------------------------

    /// Probe the account page and update the session flag accordingly.
    pub fn check_login(&mut self) -> bool {
        match probe_account_page(&self.transport, &self.endpoints.account) {
            Ok(Probe::Valid { username }) => {
                self.session.authenticate(username);
                true
            }
            Ok(Probe::Stale) => {
                self.session.invalidate();
                false
            }
            Err(e) => {
                warn!("session probe failed: {}", e);
                self.session.invalidate();
                false
            }
        }
    }

    /// Write the current cookies to the session file.
    pub fn save_session(&self) -> Result<()> {
        self.store.save(&self.transport)
    }

    /// Restore saved cookies and probe them. Returns whether the restored
    /// session is usable.
    pub fn load_session(&mut self) -> bool {
        let cookies = match self.store.read() {
            Ok(Some(cookies)) => cookies,
            Ok(None) => return false,
            Err(e) => {
                warn!(path = %self.store.path().display(), "cannot read saved session: {}", e);
                return false;
            }
        };
        info!("found saved session, verifying");
        self.transport.import_cookies(&cookies);
        if self.check_login() {
            info!(user = self.session.username().unwrap_or("-"), "using saved session");
            true
        } else {
            warn!("saved session has expired");
            false
        }
    }

    /// Log in, preferring a still-valid saved session.
    ///
    /// Every failure is reported as [`LanzouError::LoginFailed`]; the caller
    /// decides how to terminate.
    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        if self.load_session() {
            return Ok(());
        }

        info!(user = username, "logging in");
        let fields = vec![
            ("task", task::LOGIN.to_string()),
            ("uid", username.to_string()),
            ("pwd", password.to_string()),
            ("setSessionId", String::new()),
            ("setSig", String::new()),
            ("setScene", String::new()),
            ("setTocen", String::new()),
            ("formhash", String::new()),
        ];
        let origin = &self.endpoints.login_origin;
        let headers = vec![
            ("Accept", "application/json, text/javascript, */*".to_string()),
            ("Accept-Language", "zh-CN,zh;q=0.9".to_string()),
            ("Origin", origin.clone()),
            ("Referer", format!("{}/", origin)),
        ];
        let request = FormRequest {
            url: &self.endpoints.login,
            fields,
            headers,
            follow_redirects: false,
        };

        let reply = self
            .transport
            .post_form(request)
            .map_err(|e| LanzouError::LoginFailed(format!("login request failed: {}", e)))?;
        if !reply.is_ok() {
            return Err(LanzouError::LoginFailed(format!(
                "login request returned HTTP {}",
                reply.status
            )));
        }

        match serde_json::from_str::<Envelope>(&reply.body) {
            Ok(envelope) if envelope.is_ok() => self.finish_login(),
            Ok(envelope) => Err(LanzouError::LoginFailed(envelope.message())),
            Err(_) => {
                // Some deployments answer with a page instead of JSON; the
                // cookies may still be good.
                if self.check_login() {
                    self.finish_login()
                } else {
                    Err(LanzouError::LoginFailed(
                        "unable to parse login response".to_string(),
                    ))
                }
            }
        }
    }

    fn finish_login(&mut self) -> Result<()> {
        self.save_session()
            .map_err(|e| LanzouError::LoginFailed(format!("cannot save session: {}", e)))?;
        self.load_session();
        self.session.authenticate(None);
        info!("login succeeded");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Listing
    // ---------------------------------------------------------------------

    /// Subfolders of `parent_id`. Service and parse errors are logged and
    /// yield an empty list.
    pub fn list_folders(&self, parent_id: &str) -> Result<Vec<FolderEntry>> {
        self.ensure_logged_in()?;
        match self.fetch_folders(parent_id) {
            Ok(folders) => Ok(folders),
            Err(e) => {
                error!(parent_id, "failed to list folders: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn fetch_folders(&self, parent_id: &str) -> Result<Vec<FolderEntry>> {
        let envelope = self.send_and_decode(
            task::LIST_FOLDERS,
            vec![("folder_id", parent_id.to_string())],
        )?;
        match envelope.payload() {
            list @ Payload::List(_) => Ok(list.entries()?),
            // an object carrying `folderid` marks a folder without children
            _ => Ok(Vec::new()),
        }
    }

    /// Every file in `folder_id`, across all pages. Service and parse
    /// errors are logged and yield an empty list.
    pub fn list_files(&self, folder_id: &str) -> Result<Vec<FileEntry>> {
        self.ensure_logged_in()?;
        match self.fetch_files(folder_id) {
            Ok(files) => Ok(files),
            Err(e) => {
                error!(folder_id, "failed to list files: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn fetch_files(&self, folder_id: &str) -> Result<Vec<FileEntry>> {
        let mut files = Vec::new();
        let mut page: u32 = 1;
        loop {
            let envelope = self.send_and_decode(
                task::LIST_FILES,
                vec![
                    ("folder_id", folder_id.to_string()),
                    ("pg", page.to_string()),
                ],
            )?;
            let batch: Vec<FileEntry> = match envelope.payload() {
                list @ Payload::List(_) => list.entries()?,
                _ => break,
            };
            debug!(folder_id, page, count = batch.len(), "fetched file page");
            files.extend(batch);
            page += 1;
        }
        Ok(files)
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Create a folder. `None` when the service does not return an id or
    /// the request fails (logged).
    pub fn create_folder(
        &self,
        name: &str,
        parent_id: &str,
        description: &str,
    ) -> Result<Option<FolderEntry>> {
        self.ensure_logged_in()?;
        info!(name, parent_id, "creating folder");
        let envelope = match self.send_and_decode(
            task::CREATE_FOLDER,
            vec![
                ("parent_id", parent_id.to_string()),
                ("folder_name", name.to_string()),
                ("folder_description", description.to_string()),
            ],
        ) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(name, "failed to create folder: {}", e);
                return Ok(None);
            }
        };

        match envelope.payload().as_id() {
            Some(folder_id) => Ok(Some(FolderEntry {
                folder_id,
                name: name.to_string(),
                size: "0".to_string(),
                time: String::new(),
                description: description.to_string(),
            })),
            None => {
                warn!(name, "folder created but the service returned no id");
                Ok(None)
            }
        }
    }

    pub fn delete_file(&self, file_id: &str) -> Result<bool> {
        self.ensure_logged_in()?;
        info!(file_id, "deleting file");
        Ok(self.delete(task::DELETE_FILE, "file_id", file_id))
    }

    pub fn delete_folder(&self, folder_id: &str) -> Result<bool> {
        self.ensure_logged_in()?;
        info!(folder_id, "deleting folder");
        Ok(self.delete(task::DELETE_FOLDER, "folder_id", folder_id))
    }

    fn delete(&self, code: &'static str, key: &'static str, id: &str) -> bool {
        match self.send_and_decode(code, vec![(key, id.to_string())]) {
            Ok(_) => true,
            Err(e) => {
                error!(id, "delete failed: {}", e);
                false
            }
        }
    }

    // ---------------------------------------------------------------------
    // Sharing & upload
    // ---------------------------------------------------------------------

    /// Public share link for an uploaded file.
    ///
    /// Requires `zt == 1` and an `info` object with a non-empty `is_newd`.
    pub fn fetch_share_link(&self, file_id: &str) -> Result<Option<String>> {
        self.ensure_logged_in()?;
        let envelope = self.send_and_decode(task::SHARE_LINK, vec![("file_id", file_id.to_string())])?;
        let link = match &envelope.info {
            Value::Object(info) => info
                .get("is_newd")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            _ => None,
        };
        if link.is_none() {
            warn!(file_id, "share link missing from response");
        }
        Ok(link)
    }

    /// Upload `path` into `folder_id` and return its share link.
    ///
    /// `Ok(None)` means the service did not accept the file or returned no
    /// link; transport errors are returned so a retry loop can see them.
    pub fn upload_file(
        &self,
        path: &Path,
        folder_id: &str,
        progress: &ProgressBar,
    ) -> Result<Option<String>> {
        self.ensure_logged_in()?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| LanzouError::LocalFileMissing(path.to_path_buf()))?;
        info!(file = %file_name, folder_id, "uploading");

        let request = UploadRequest {
            url: &self.endpoints.upload,
            fields: vec![
                ("task", task::UPLOAD.to_string()),
                ("vie", "2".to_string()),
                ("ve", "2".to_string()),
                ("id", "WU_FILE_0".to_string()),
                ("name", file_name.clone()),
                ("folder_id_bb_n", folder_id.to_string()),
            ],
            file_field: "upload_file",
            path,
            file_name,
            progress: progress.clone(),
        };
        let reply = self.transport.post_multipart(request)?;
        if !reply.is_ok() {
            warn!(status = reply.status, "upload rejected");
            return Ok(None);
        }

        let envelope: Envelope = serde_json::from_str(&reply.body)?;
        if !envelope.is_ok() {
            warn!("upload refused: {}", envelope.message());
            return Ok(None);
        }
        let file_id = match envelope.payload() {
            Payload::List(items) => items
                .first()
                .and_then(|first| first.get("id"))
                .and_then(|id| match id {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                }),
            _ => None,
        };
        match file_id {
            Some(id) => {
                info!(file_id = %id, "upload finished, requesting share link");
                self.fetch_share_link(&id)
            }
            None => {
                warn!("upload response carried no file id");
                Ok(None)
            }
        }
    }
}

impl<T: Transport> FolderSource for LanzouClient<T> {
    fn list_folders(&self, parent_id: &str) -> Result<Vec<FolderEntry>> {
        LanzouClient::list_folders(self, parent_id)
    }
}
