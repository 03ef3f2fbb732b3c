use async_trait::async_trait;
use client_core::{
    ClientError, ClientErrorCategory, ClientResult, ConnectionRequest, Conversation,
    DashboardSummary, DatingApi, LoginCredentials, Message, ProfileUpdate, ReviewDecision,
    SignupForm, User,
};
use reqwest::{Client, Method, RequestBuilder, multipart};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

/// Response body shape shared by every endpoint.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    user: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
}

impl Envelope {
    fn data<T: DeserializeOwned>(self) -> ClientResult<T> {
        decode_field("data", self.data)
    }

    fn optional_data<T: DeserializeOwned>(self) -> ClientResult<Option<T>> {
        match self.data {
            None | Some(Value::Null) => Ok(None),
            Some(value) => decode_field("data", Some(value)).map(Some),
        }
    }

    /// Auth endpoints answer with `user`; some deployments nest it in `data`.
    fn user(self) -> ClientResult<User> {
        decode_field("user", self.user.or(self.data))
    }
}

/// Bondly REST client.
///
/// The session rides on a cookie the API sets at login; the reqwest cookie
/// store replays it on every later call.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
}

impl HttpApi {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder().cookie_store(true).build().map_err(|err| {
            ClientError::new(
                ClientErrorCategory::Config,
                "http_client_build_error",
                err.to_string(),
            )
        })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::new(
                    ClientErrorCategory::Config,
                    "invalid_base_url",
                    format!("'{}' cannot carry a path", self.base_url),
                )
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ClientResult<RequestBuilder> {
        Ok(self.client.request(method, self.endpoint(segments)?))
    }

    /// Send `request` and return the raw 2xx body.
    async fn send(&self, request: RequestBuilder) -> ClientResult<(String, Vec<u8>)> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let url = response.url().path().to_owned();
        let body = response.bytes().await.map_err(map_transport_error)?;

        if !status.is_success() {
            debug!(path = %url, status = status.as_u16(), "api answered with error status");
            return Err(ClientError::from_status(
                status.as_u16(),
                envelope_message(&body),
            ));
        }
        Ok((url, body.to_vec()))
    }

    /// Endpoints whose answer carries nothing but the status; any 2xx body is ignored.
    async fn check_status(&self, request: RequestBuilder) -> ClientResult<()> {
        self.send(request).await.map(drop)
    }

    async fn execute(&self, request: RequestBuilder) -> ClientResult<Envelope> {
        let (url, body) = self.send(request).await?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Envelope::default());
        }

        serde_json::from_slice(&body).map_err(|err| {
            ClientError::malformed(format!("response from {url} is not a json envelope: {err}"))
        })
    }
}

#[async_trait]
impl DatingApi for HttpApi {
    async fn verify_session(&self) -> ClientResult<()> {
        self.check_status(self.request(Method::GET, &["verify-token"])?)
            .await
    }

    async fn login(&self, credentials: &LoginCredentials) -> ClientResult<User> {
        let request = self.request(Method::POST, &["login"])?.json(&json!({
            "emailId": credentials.email,
            "password": credentials.password,
        }));
        self.execute(request).await?.user()
    }

    async fn signup(&self, form: &SignupForm) -> ClientResult<User> {
        let request = self
            .request(Method::POST, &["signup"])?
            .multipart(signup_form(form)?);
        self.execute(request).await?.user()
    }

    async fn fetch_profile(&self, user_id: Option<&str>) -> ClientResult<User> {
        let request = match user_id {
            Some(user_id) => self.request(Method::GET, &["profile", user_id])?,
            None => self.request(Method::GET, &["profile"])?,
        };
        self.execute(request).await?.data()
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<User> {
        let request = self
            .request(Method::PATCH, &["profile", "edit"])?
            .json(update);
        self.execute(request).await?.data()
    }

    async fn fetch_feed(&self) -> ClientResult<Vec<User>> {
        self.execute(self.request(Method::GET, &["feed"])?)
            .await?
            .data()
    }

    async fn send_interest(&self, to_user_id: &str) -> ClientResult<Option<ConnectionRequest>> {
        let request = self.request(
            Method::POST,
            &["request", "send", "interested", to_user_id],
        )?;
        self.execute(request).await?.optional_data()
    }

    async fn received_requests(&self) -> ClientResult<Vec<ConnectionRequest>> {
        self.execute(self.request(Method::GET, &["user", "requests", "received"])?)
            .await?
            .data()
    }

    async fn review_request(
        &self,
        request_id: &str,
        decision: ReviewDecision,
    ) -> ClientResult<Option<ConnectionRequest>> {
        let request = self.request(
            Method::POST,
            &["request", "review", decision.as_path_segment(), request_id],
        )?;
        self.execute(request).await?.optional_data()
    }

    async fn initiate_conversation(&self, other_user_id: &str) -> ClientResult<Conversation> {
        self.execute(self.request(Method::POST, &["chat", "initiate", other_user_id])?)
            .await?
            .data()
    }

    async fn list_conversations(&self) -> ClientResult<Vec<Conversation>> {
        self.execute(self.request(Method::GET, &["chat", "conversations"])?)
            .await?
            .data()
    }

    async fn list_messages(&self, conversation_id: &str) -> ClientResult<Vec<Message>> {
        let request = self.request(
            Method::GET,
            &["chat", "conversations", conversation_id, "messages"],
        )?;
        self.execute(request).await?.data()
    }

    async fn send_message(&self, conversation_id: &str, content: &str) -> ClientResult<Message> {
        let request = self
            .request(
                Method::POST,
                &["chat", "conversations", conversation_id, "messages"],
            )?
            .json(&json!({ "content": content }));
        self.execute(request).await?.data()
    }

    async fn delete_message(&self, message_id: &str) -> ClientResult<Option<Message>> {
        self.execute(self.request(Method::DELETE, &["chat", "messages", message_id])?)
            .await?
            .optional_data()
    }

    async fn mark_read(&self, conversation_id: &str) -> ClientResult<()> {
        let request = self.request(
            Method::PATCH,
            &["chat", "conversations", conversation_id, "read"],
        )?;
        self.check_status(request).await
    }

    async fn dashboard(&self) -> ClientResult<DashboardSummary> {
        self.execute(self.request(Method::GET, &["dashboard"])?)
            .await?
            .data()
    }
}

/// Parse and check an API base URL (`http` or `https` only).
pub fn parse_base_url(raw: &str) -> ClientResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|err| {
        ClientError::new(
            ClientErrorCategory::Config,
            "invalid_base_url",
            format!("'{raw}' is not a valid url: {err}"),
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::new(
            ClientErrorCategory::Config,
            "invalid_base_url",
            format!("'{raw}' must use http or https"),
        ));
    }
    Ok(url)
}

fn signup_form(form: &SignupForm) -> ClientResult<multipart::Form> {
    let interests = serde_json::to_string(&form.interests).map_err(|err| {
        ClientError::new(
            ClientErrorCategory::Internal,
            "signup_serialize_error",
            err.to_string(),
        )
    })?;

    let mut body = multipart::Form::new()
        .text("name", form.name.clone())
        .text("email", form.email.clone())
        .text("age", form.age.trim().to_owned())
        .text("location", form.location.clone())
        .text("password", form.password.clone())
        .text("bio", form.bio.clone())
        .text("interests", interests);

    for photo in &form.photos {
        let part = multipart::Part::bytes(photo.bytes.clone())
            .file_name(photo.file_name.clone())
            .mime_str(&photo.content_type)
            .map_err(|err| {
                ClientError::validation(format!(
                    "unsupported photo type '{}': {err}",
                    photo.content_type
                ))
            })?;
        body = body.part("photos", part);
    }
    Ok(body)
}

fn decode_field<T: DeserializeOwned>(field: &str, value: Option<Value>) -> ClientResult<T> {
    let value = value
        .ok_or_else(|| ClientError::malformed(format!("response has no `{field}` field")))?;
    serde_json::from_value(value)
        .map_err(|err| ClientError::malformed(format!("invalid `{field}` field: {err}")))
}

fn envelope_message(body: &[u8]) -> Option<String> {
    let envelope: Envelope = serde_json::from_slice(body).ok()?;
    match envelope.message? {
        Value::String(message) => Some(message),
        _ => None,
    }
}

fn map_transport_error(err: reqwest::Error) -> ClientError {
    if err.is_decode() {
        ClientError::malformed(err.to_string())
    } else if err.is_builder() {
        ClientError::new(
            ClientErrorCategory::Config,
            "invalid_request",
            err.to_string(),
        )
    } else {
        ClientError::network(err.to_string())
    }
}
