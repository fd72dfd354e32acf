use chrono::{Datelike, Local, Months, NaiveDate, NaiveDateTime};
use futures::future::LocalBoxFuture;
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use thiserror::Error;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    CanvasRenderingContext2d, HtmlCanvasElement, HtmlInputElement, HtmlSelectElement,
    HtmlVideoElement, MediaStream, MediaStreamConstraints, MediaStreamTrack,
    MediaTrackConstraints,
};
use yew::prelude::*;

// Dev builds go through a same-origin proxy; deployments set the backend
// address at build time.
const API_BASE_URL: &str = match option_env!("RECEIPT_API_URL") {
    Some(url) => url,
    None => "",
};

const LIST_LIMIT: u32 = 100;
const FREQUENT_ITEMS_LIMIT: u32 = 10;
const JPEG_QUALITY: f64 = 0.9;
const SAVE_ERROR_REVERT_MS: u32 = 2_000;

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineItem {
    #[serde(default)]
    no: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    barcode: Option<String>,
    #[serde(default)]
    unit_price: i64,
    #[serde(default)]
    quantity: i64,
    #[serde(default)]
    amount: i64,
}

impl LineItem {
    fn apply_edit(&mut self, field: EditField, value: &str) {
        match field {
            EditField::Name => self.name = value.to_string(),
            EditField::UnitPrice => {
                self.unit_price = digits_to_int(value);
                self.amount = self.unit_price * self.quantity;
            }
            EditField::Quantity => {
                self.quantity = digits_to_int(value);
                self.amount = self.unit_price * self.quantity;
            }
            // a manual amount override stands on its own
            EditField::Amount => self.amount = digits_to_int(value),
        }
    }

    // raw value shown inside the input while a cell is being edited
    fn field_text(&self, field: EditField) -> String {
        match field {
            EditField::Name => self.name.clone(),
            EditField::UnitPrice => self.unit_price.to_string(),
            EditField::Quantity => self.quantity.to_string(),
            EditField::Amount => self.amount.to_string(),
        }
    }

    // formatted value shown when the cell is idle
    fn field_display(&self, field: EditField) -> String {
        match field {
            EditField::Name => self.name.clone(),
            EditField::UnitPrice => format_with_commas(self.unit_price),
            EditField::Quantity => format_with_commas(self.quantity),
            EditField::Amount => format_with_commas(self.amount),
        }
    }

    fn normalized(&self) -> LineItem {
        LineItem {
            no: self.no.clone(),
            name: self.name.clone(),
            barcode: self.barcode.clone().filter(|code| !code.is_empty()),
            unit_price: self.unit_price,
            quantity: self.quantity,
            amount: self.amount,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EditField {
    Name,
    UnitPrice,
    Quantity,
    Amount,
}

impl EditField {
    fn input_type(self) -> &'static str {
        match self {
            EditField::Name => "text",
            _ => "tel",
        }
    }
}

fn digits_to_int(raw: &str) -> i64 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OcrResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    items: Vec<LineItem>,
    #[serde(default)]
    raw_text: String,
    #[serde(default)]
    store_name: Option<String>,
    #[serde(default)]
    card_name: Option<String>,
    #[serde(default)]
    purchase_date_time: Option<String>,
}

#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveReceiptRequest {
    items: Vec<LineItem>,
    raw_text: String,
    store_name: Option<String>,
    card_name: Option<String>,
    purchase_date_time: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum DraftMode {
    Pristine,
    Dirty,
}

#[derive(Clone, PartialEq)]
struct ReceiptDraft {
    items: Vec<LineItem>,
    raw_text: String,
    store_name: Option<String>,
    card_name: Option<String>,
    purchase_date_time: Option<String>,
    mode: DraftMode,
}

impl ReceiptDraft {
    fn from_ocr(data: &OcrResponse) -> Self {
        Self {
            items: data.items.clone(),
            raw_text: data.raw_text.clone(),
            store_name: data.store_name.clone(),
            card_name: data.card_name.clone(),
            purchase_date_time: data.purchase_date_time.clone(),
            mode: DraftMode::Pristine,
        }
    }

    // A refreshed payload only replaces a draft the user has not touched.
    fn refresh_from(&mut self, data: &OcrResponse) -> bool {
        if self.mode == DraftMode::Dirty {
            return false;
        }
        *self = Self::from_ocr(data);
        true
    }

    fn apply_edit(&mut self, index: usize, field: EditField, value: &str) {
        if let Some(item) = self.items.get_mut(index) {
            item.apply_edit(field, value);
            self.mode = DraftMode::Dirty;
        }
    }

    fn total(&self) -> i64 {
        self.items.iter().map(|item| item.amount).sum()
    }

    fn to_save_request(&self) -> SaveReceiptRequest {
        SaveReceiptRequest {
            items: self.items.iter().map(LineItem::normalized).collect(),
            raw_text: self.raw_text.clone(),
            store_name: self.store_name.clone(),
            card_name: self.card_name.clone(),
            purchase_date_time: self.purchase_date_time.clone(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Error,
}

enum SaveAction {
    Begin,
    Succeed,
    Fail,
    Revert,
}

impl SaveStatus {
    fn step(self, action: SaveAction) -> SaveStatus {
        match (self, action) {
            (SaveStatus::Idle | SaveStatus::Error, SaveAction::Begin) => SaveStatus::Saving,
            (SaveStatus::Saving, SaveAction::Succeed) => SaveStatus::Saved,
            (SaveStatus::Saving, SaveAction::Fail) => SaveStatus::Error,
            (SaveStatus::Error, SaveAction::Revert) => SaveStatus::Idle,
            // Saved is terminal; everything else ignores out-of-order actions
            (current, _) => current,
        }
    }

    fn can_edit(self) -> bool {
        self != SaveStatus::Saved
    }

    fn can_save(self) -> bool {
        matches!(self, SaveStatus::Idle | SaveStatus::Error)
    }

    fn button_label(self) -> &'static str {
        match self {
            SaveStatus::Idle => "Save",
            SaveStatus::Saving => "Saving...",
            SaveStatus::Saved => "Saved",
            SaveStatus::Error => "Save failed",
        }
    }
}

impl Reducible for SaveStatus {
    type Action = SaveAction;

    fn reduce(self: Rc<Self>, action: SaveAction) -> Rc<Self> {
        Rc::new(self.step(action))
    }
}

#[derive(Clone, PartialEq, Deserialize)]
struct ReceiptSummary {
    id: i64,
    #[serde(default)]
    store_name: Option<String>,
    #[serde(default)]
    card_name: Option<String>,
    #[serde(default)]
    purchase_datetime: Option<String>,
    #[serde(default)]
    total_amount: i64,
}

#[derive(Clone, PartialEq, Deserialize)]
struct SavedItem {
    #[serde(default)]
    no: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    unit_price: i64,
    #[serde(default)]
    quantity: i64,
    #[serde(default)]
    amount: i64,
}

#[derive(Clone, PartialEq, Deserialize, Default)]
struct StatsSummary {
    #[serde(default)]
    total_amount: i64,
    #[serde(default)]
    receipt_count: i64,
    #[serde(default)]
    avg_amount: i64,
}

#[derive(Clone, PartialEq, Deserialize)]
struct MonthlyStat {
    month: String,
    #[serde(default)]
    total_amount: i64,
    #[serde(default)]
    receipt_count: i64,
}

#[derive(Clone, PartialEq, Deserialize)]
struct StoreStat {
    store_name: String,
    #[serde(default)]
    total_amount: i64,
    #[serde(default)]
    visit_count: i64,
}

#[derive(Clone, PartialEq, Deserialize)]
struct CardStat {
    card_name: String,
    #[serde(default)]
    total_amount: i64,
    #[serde(default)]
    usage_count: i64,
}

#[derive(Clone, PartialEq, Deserialize)]
struct FrequentItem {
    name: String,
    #[serde(default)]
    purchase_count: i64,
    #[serde(default)]
    total_amount: i64,
    #[serde(default)]
    avg_interval_days: Option<i64>,
}

#[derive(Clone, PartialEq)]
struct ReceiptQuery {
    limit: u32,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    store_name: Option<String>,
    card_name: Option<String>,
    search: Option<String>,
}

impl ReceiptQuery {
    // Only filters that are actually set become query parameters.
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if let Some(date) = self.start_date {
            params.push(("start_date", format_date_param(date)));
        }
        if let Some(date) = self.end_date {
            params.push(("end_date", format_date_param(date)));
        }
        if let Some(store) = &self.store_name {
            params.push(("store_name", store.clone()));
        }
        if let Some(card) = &self.card_name {
            params.push(("card_name", card.clone()));
        }
        if let Some(text) = &self.search {
            params.push(("search", text.clone()));
        }
        params
    }
}

#[derive(Clone, Copy, PartialEq)]
enum QuickRange {
    ThisMonth,
    LastMonth,
    ThreeMonths,
    ThisYear,
}

impl QuickRange {
    const ALL: [QuickRange; 4] = [
        QuickRange::ThisMonth,
        QuickRange::LastMonth,
        QuickRange::ThreeMonths,
        QuickRange::ThisYear,
    ];

    fn label(self) -> &'static str {
        match self {
            QuickRange::ThisMonth => "This month",
            QuickRange::LastMonth => "Last month",
            QuickRange::ThreeMonths => "3 months",
            QuickRange::ThisYear => "This year",
        }
    }

    fn bounds(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            QuickRange::ThisMonth => (start_of_month(today), today),
            QuickRange::LastMonth => {
                let end = start_of_month(today).pred_opt().unwrap_or(today);
                (start_of_month(end), end)
            }
            QuickRange::ThreeMonths => (start_of_month(months_back(today, 2)), today),
            QuickRange::ThisYear => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                today,
            ),
        }
    }
}

fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn months_back(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(date)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// The backend expects two-digit-year date parameters.
fn format_date_param(date: NaiveDate) -> String {
    date.format("%y-%m-%d").to_string()
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Api(String),
}

impl From<gloo_net::Error> for ApiError {
    fn from(err: gloo_net::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

fn api_failure(error: Option<String>, fallback: &str) -> ApiError {
    ApiError::Api(error.unwrap_or_else(|| fallback.to_string()))
}

#[derive(Deserialize)]
struct BasicResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct StatsResponse<T> {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default = "Option::default")]
    data: Option<T>,
}

#[derive(Deserialize)]
struct ReceiptsResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    receipts: Vec<ReceiptSummary>,
}

#[derive(Clone, PartialEq, Deserialize)]
struct ReceiptDetailResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    receipt: Option<ReceiptSummary>,
    #[serde(default)]
    items: Vec<SavedItem>,
}

async fn analyze_receipt(image: &str) -> Result<OcrResponse, ApiError> {
    let url = format!("{}/api/ocr", API_BASE_URL);
    let payload = serde_json::json!({ "image": image });
    let resp = Request::post(&url).json(&payload)?.send().await?;
    if !resp.ok() {
        return Err(ApiError::Network(format!(
            "analyze request failed with status {}",
            resp.status()
        )));
    }
    let body: OcrResponse = resp.json().await?;
    if !body.success {
        return Err(api_failure(body.error.clone(), "Receipt analysis failed."));
    }
    Ok(body)
}

async fn save_receipt(payload: &SaveReceiptRequest) -> Result<(), ApiError> {
    let url = format!("{}/api/receipts", API_BASE_URL);
    let resp = Request::post(&url).json(payload)?.send().await?;
    if !resp.ok() {
        return Err(ApiError::Network(format!(
            "save request failed with status {}",
            resp.status()
        )));
    }
    let body: BasicResponse = resp.json().await?;
    if !body.success {
        return Err(api_failure(body.error, "Could not save the receipt."));
    }
    Ok(())
}

async fn fetch_receipts(query: &ReceiptQuery) -> Result<Vec<ReceiptSummary>, ApiError> {
    let url = format!("{}/api/receipts", API_BASE_URL);
    let params = query.query_params();
    let resp = Request::get(&url)
        .query(params.iter().map(|(key, value)| (*key, value.as_str())))
        .send()
        .await?;
    if !resp.ok() {
        return Err(ApiError::Network(format!(
            "list request failed with status {}",
            resp.status()
        )));
    }
    let body: ReceiptsResponse = resp.json().await?;
    if !body.success {
        return Err(api_failure(body.error, "Could not load receipts."));
    }
    Ok(body.receipts)
}

async fn fetch_receipt_detail(id: i64) -> Result<ReceiptDetailResponse, ApiError> {
    let url = format!("{}/api/receipts/{}", API_BASE_URL, id);
    let resp = Request::get(&url).send().await?;
    if !resp.ok() {
        return Err(ApiError::Network(format!(
            "detail request failed with status {}",
            resp.status()
        )));
    }
    let body: ReceiptDetailResponse = resp.json().await?;
    if !body.success {
        return Err(api_failure(
            body.error.clone(),
            "Could not load the receipt detail.",
        ));
    }
    Ok(body)
}

async fn delete_receipt(id: i64) -> Result<(), ApiError> {
    let url = format!("{}/api/receipts/{}", API_BASE_URL, id);
    let resp = Request::delete(&url).send().await?;
    if !resp.ok() {
        return Err(ApiError::Network(format!(
            "delete request failed with status {}",
            resp.status()
        )));
    }
    let body: BasicResponse = resp.json().await?;
    if !body.success {
        return Err(api_failure(body.error, "Could not delete the receipt."));
    }
    Ok(())
}

async fn fetch_stats<T: DeserializeOwned>(
    path: &str,
    params: Vec<(&'static str, String)>,
) -> Result<T, ApiError> {
    let url = format!("{}{}", API_BASE_URL, path);
    let resp = Request::get(&url)
        .query(params.iter().map(|(key, value)| (*key, value.as_str())))
        .send()
        .await?;
    if !resp.ok() {
        return Err(ApiError::Network(format!(
            "stats request failed with status {}",
            resp.status()
        )));
    }
    let body: StatsResponse<T> = resp.json().await?;
    if !body.success {
        return Err(api_failure(body.error, "Could not load statistics."));
    }
    body.data
        .ok_or_else(|| ApiError::Api("empty statistics payload".to_string()))
}

fn range_params(start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("start_date", format_date_param(start)),
        ("end_date", format_date_param(end)),
    ]
}

async fn fetch_summary(start: NaiveDate, end: NaiveDate) -> Result<StatsSummary, ApiError> {
    fetch_stats("/api/stats/summary", range_params(start, end)).await
}

async fn fetch_monthly_stats(
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<MonthlyStat>, ApiError> {
    fetch_stats("/api/stats/monthly", range_params(start, end)).await
}

async fn fetch_store_stats(start: NaiveDate, end: NaiveDate) -> Result<Vec<StoreStat>, ApiError> {
    fetch_stats("/api/stats/by-store", range_params(start, end)).await
}

async fn fetch_card_stats(start: NaiveDate, end: NaiveDate) -> Result<Vec<CardStat>, ApiError> {
    fetch_stats("/api/stats/by-card", range_params(start, end)).await
}

async fn fetch_frequent_items(
    start: NaiveDate,
    end: NaiveDate,
    limit: u32,
) -> Result<Vec<FrequentItem>, ApiError> {
    let mut params = range_params(start, end);
    params.push(("limit", limit.to_string()));
    fetch_stats("/api/stats/frequent-items", params).await
}

async fn fetch_store_card_stats(
    store_name: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<CardStat>, ApiError> {
    let encoded = String::from(js_sys::encode_uri_component(store_name));
    let path = format!("/api/stats/store/{}/cards", encoded);
    fetch_stats(&path, range_params(start, end)).await
}

async fn check_health() -> Result<(), ApiError> {
    let url = format!("{}/health", API_BASE_URL);
    let resp = Request::get(&url).send().await?;
    if !resp.ok() {
        return Err(ApiError::Network(format!(
            "health probe failed with status {}",
            resp.status()
        )));
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum FacingMode {
    Environment,
    User,
}

impl FacingMode {
    fn as_constraint(self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }

    fn flipped(self) -> FacingMode {
        match self {
            FacingMode::Environment => FacingMode::User,
            FacingMode::User => FacingMode::Environment,
        }
    }
}

fn video_constraints(facing: FacingMode) -> MediaStreamConstraints {
    let ideal_width = js_sys::Object::new();
    let _ = js_sys::Reflect::set(
        &ideal_width,
        &JsValue::from_str("ideal"),
        &JsValue::from_f64(1920.0),
    );
    let ideal_height = js_sys::Object::new();
    let _ = js_sys::Reflect::set(
        &ideal_height,
        &JsValue::from_str("ideal"),
        &JsValue::from_f64(1080.0),
    );

    let video = MediaTrackConstraints::new();
    video.set_facing_mode(&JsValue::from_str(facing.as_constraint()));
    video.set_width(&ideal_width.into());
    video.set_height(&ideal_height.into());

    let constraints = MediaStreamConstraints::new();
    constraints.set_video(&video.into());
    constraints
}

fn stop_tracks(stream: &MediaStream) {
    for track in stream.get_tracks().iter() {
        track.unchecked_into::<MediaStreamTrack>().stop();
    }
}

async fn acquire_stream(facing: FacingMode) -> Result<MediaStream, String> {
    let window = web_sys::window().ok_or("no window")?;
    let devices = window
        .navigator()
        .media_devices()
        .map_err(|_| "camera API unavailable".to_string())?;
    let promise = devices
        .get_user_media_with_constraints(&video_constraints(facing))
        .map_err(|_| "camera request rejected".to_string())?;
    let value = JsFuture::from(promise)
        .await
        .map_err(|_| "camera permission denied or no device".to_string())?;
    value
        .dyn_into::<MediaStream>()
        .map_err(|_| "unexpected stream object".to_string())
}

fn capture_frame(video: &HtmlVideoElement) -> Result<String, String> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or("no document")?;
    let canvas = document
        .create_element("canvas")
        .map_err(|_| "canvas unavailable".to_string())?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| "canvas unavailable".to_string())?;
    // capture at the video's native resolution, not the display size
    canvas.set_width(video.video_width());
    canvas.set_height(video.video_height());
    let context = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .ok_or("2d context unavailable")?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| "2d context unavailable".to_string())?;
    // drawn from the source stream, so the encoded frame is never mirrored
    context
        .draw_image_with_html_video_element(video, 0.0, 0.0)
        .map_err(|_| "frame draw failed".to_string())?;
    canvas
        .to_data_url_with_type_and_encoder_options("image/jpeg", &JsValue::from_f64(JPEG_QUALITY))
        .map_err(|_| "encode failed".to_string())
}

#[derive(Properties, PartialEq)]
struct CameraCaptureProps {
    on_capture: Callback<String>,
}

#[function_component(CameraCapture)]
fn camera_capture(props: &CameraCaptureProps) -> Html {
    let video_ref = use_node_ref();
    let stream = use_mut_ref(|| None::<MediaStream>);
    let streaming = use_state(|| false);
    let facing = use_state(|| FacingMode::Environment);
    let error = use_state(|| None::<String>);

    let start_camera = {
        let video_ref = video_ref.clone();
        let stream = stream.clone();
        let streaming = streaming.clone();
        let error = error.clone();
        Callback::from(move |mode: FacingMode| {
            let video_ref = video_ref.clone();
            let stream = stream.clone();
            let streaming = streaming.clone();
            let error = error.clone();
            spawn_local(async move {
                error.set(None);
                // the old stream's tracks are released before a new one is requested
                if let Some(old) = stream.borrow_mut().take() {
                    stop_tracks(&old);
                }
                match acquire_stream(mode).await {
                    Ok(new_stream) => {
                        if let Some(video) = video_ref.cast::<HtmlVideoElement>() {
                            video.set_src_object(Some(&new_stream));
                        }
                        *stream.borrow_mut() = Some(new_stream);
                        streaming.set(true);
                    }
                    Err(err) => {
                        gloo_console::error!(format!("camera: {err}"));
                        error.set(Some(
                            "Could not access the camera. Check permissions and try again."
                                .to_string(),
                        ));
                        streaming.set(false);
                    }
                }
            });
        })
    };

    let stop_camera = {
        let video_ref = video_ref.clone();
        let stream = stream.clone();
        let streaming = streaming.clone();
        Callback::from(move |_| {
            if let Some(old) = stream.borrow_mut().take() {
                stop_tracks(&old);
            }
            if let Some(video) = video_ref.cast::<HtmlVideoElement>() {
                video.set_src_object(None);
            }
            streaming.set(false);
        })
    };

    let on_switch = {
        let facing = facing.clone();
        let streaming = streaming.clone();
        let start_camera = start_camera.clone();
        Callback::from(move |_| {
            let next = (*facing).flipped();
            facing.set(next);
            // a live stream restarts immediately under the new facing mode
            if *streaming {
                start_camera.emit(next);
            }
        })
    };

    let on_capture_click = {
        let video_ref = video_ref.clone();
        let on_capture = props.on_capture.clone();
        let error = error.clone();
        Callback::from(move |_| {
            if let Some(video) = video_ref.cast::<HtmlVideoElement>() {
                match capture_frame(&video) {
                    Ok(data_url) => on_capture.emit(data_url),
                    Err(err) => {
                        gloo_console::error!(format!("capture: {err}"));
                        error.set(Some("Could not capture the frame.".to_string()));
                    }
                }
            }
        })
    };

    let on_start_click = {
        let facing = facing.clone();
        let start_camera = start_camera.clone();
        Callback::from(move |_| start_camera.emit(*facing))
    };

    {
        // release the device when the component unmounts
        let stream = stream.clone();
        use_effect_with_deps(
            move |_| {
                move || {
                    if let Some(old) = stream.borrow_mut().take() {
                        stop_tracks(&old);
                    }
                }
            },
            (),
        );
    }

    let mirror_style = if *facing == FacingMode::User {
        "transform: scaleX(-1);"
    } else {
        ""
    };

    html! {
        <div class="bg-card rounded-xl border border-border p-4">
            {
                if let Some(message) = &*error {
                    html! {
                        <div class="bg-red-50 border border-red-200 text-red-700 text-sm px-4 py-3 rounded-lg mb-4">
                            { message.clone() }
                        </div>
                    }
                } else {
                    html! {}
                }
            }

            <div class="relative bg-black rounded-lg overflow-hidden min-h-[200px]">
                <video
                    ref={video_ref}
                    autoplay={true}
                    muted={true}
                    playsinline={true}
                    class="w-full block"
                    style={mirror_style}
                />
                {
                    if *streaming {
                        html! {
                            <div class="absolute inset-0 flex items-center justify-center pointer-events-none">
                                <div class="border-2 border-dashed border-white/80 rounded-lg w-4/5 h-3/5 flex items-end justify-center pb-2">
                                    <span class="text-white/90 text-xs bg-black/40 px-2 py-1 rounded">
                                        {"Fit the receipt inside the frame"}
                                    </span>
                                </div>
                            </div>
                        }
                    } else {
                        html! {}
                    }
                }
            </div>

            <div class="flex items-center justify-center gap-3 mt-4">
                {
                    if !*streaming {
                        html! {
                            <button onclick={on_start_click} class="flex items-center gap-2 bg-primary text-primary-foreground px-5 py-2.5 rounded-xl font-bold text-sm hover:opacity-90 transition-all">
                                { icon_camera() }
                                { if error.is_some() { "Try again" } else { "Start camera" } }
                            </button>
                        }
                    } else {
                        html! {
                            <>
                                <button onclick={on_switch} class="flex items-center gap-2 bg-secondary text-secondary-foreground px-4 py-2.5 rounded-xl font-medium text-sm hover:opacity-90 transition-all">
                                    { icon_refresh_cw() }
                                    { if *facing == FacingMode::User { "Back camera" } else { "Front camera" } }
                                </button>
                                <button onclick={on_capture_click} class="bg-primary text-primary-foreground px-6 py-2.5 rounded-xl font-bold text-sm hover:opacity-90 transition-all">
                                    {"Capture"}
                                </button>
                                <button onclick={stop_camera} class="bg-secondary text-secondary-foreground px-4 py-2.5 rounded-xl font-medium text-sm hover:opacity-90 transition-all">
                                    {"Stop"}
                                </button>
                            </>
                        }
                    }
                }
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct ImagePreviewProps {
    image_data: String,
    on_retake: Callback<()>,
    on_confirm: Callback<()>,
}

#[function_component(ImagePreview)]
fn image_preview(props: &ImagePreviewProps) -> Html {
    let on_retake = {
        let on_retake = props.on_retake.clone();
        Callback::from(move |_| on_retake.emit(()))
    };
    let on_confirm = {
        let on_confirm = props.on_confirm.clone();
        Callback::from(move |_| on_confirm.emit(()))
    };

    html! {
        <div class="bg-card rounded-xl border border-border p-4">
            <h3 class="text-lg font-bold text-foreground mb-3">{"Captured image"}</h3>

            <div class="rounded-lg overflow-hidden border border-border">
                <img src={props.image_data.clone()} alt="Captured receipt" class="w-full block" />
            </div>

            <div class="flex items-center justify-center gap-3 mt-4">
                <button onclick={on_retake} class="bg-secondary text-secondary-foreground px-5 py-2.5 rounded-xl font-medium text-sm hover:opacity-90 transition-all">
                    {"Retake"}
                </button>
                <button onclick={on_confirm} class="bg-primary text-primary-foreground px-5 py-2.5 rounded-xl font-bold text-sm hover:opacity-90 transition-all">
                    {"Analyze image"}
                </button>
            </div>
        </div>
    }
}

type SaveFuture = LocalBoxFuture<'static, Result<(), ApiError>>;

// The result table never talks to the network itself; the enclosing page
// supplies the collaborator that performs the actual save.
#[derive(Clone)]
struct SaveHandler(Rc<dyn Fn(SaveReceiptRequest) -> SaveFuture>);

impl PartialEq for SaveHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Properties, PartialEq)]
struct ResultTableProps {
    data: OcrResponse,
    on_reset: Callback<()>,
    save_handler: SaveHandler,
}

fn editable_cell(
    draft: &UseStateHandle<ReceiptDraft>,
    editing: &UseStateHandle<Option<(usize, EditField)>>,
    status: SaveStatus,
    index: usize,
    field: EditField,
    item: &LineItem,
    class: &'static str,
) -> Html {
    let is_editing = **editing == Some((index, field));

    if is_editing {
        let oninput = {
            let draft = draft.clone();
            Callback::from(move |e: InputEvent| {
                if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                    let mut next = (*draft).clone();
                    next.apply_edit(index, field, &input.value());
                    draft.set(next);
                }
            })
        };
        let onblur = {
            let editing = editing.clone();
            Callback::from(move |_: FocusEvent| editing.set(None))
        };
        let onkeydown = {
            let editing = editing.clone();
            Callback::from(move |e: KeyboardEvent| {
                if e.key() == "Enter" {
                    editing.set(None);
                }
            })
        };
        html! {
            <input
                type={field.input_type()}
                value={item.field_text(field)}
                {oninput}
                {onblur}
                {onkeydown}
                autofocus={true}
                class="w-full px-1 py-0.5 border border-primary rounded text-sm"
            />
        }
    } else {
        let onclick = {
            let editing = editing.clone();
            Callback::from(move |_| {
                // edits are locked once the draft is saved
                if status.can_edit() {
                    editing.set(Some((index, field)));
                }
            })
        };
        html! {
            <span onclick={onclick} class={class}>
                { item.field_display(field) }
            </span>
        }
    }
}

#[function_component(ResultTable)]
fn result_table(props: &ResultTableProps) -> Html {
    let draft = use_state(|| ReceiptDraft::from_ocr(&props.data));
    let editing = use_state(|| None::<(usize, EditField)>);
    let save_status = use_reducer(|| SaveStatus::Idle);
    let save_error = use_state(|| None::<String>);

    {
        // a newer OCR payload only replaces the draft while it is untouched
        let draft = draft.clone();
        use_effect_with_deps(
            move |data: &OcrResponse| {
                let mut next = (*draft).clone();
                if next.refresh_from(data) {
                    draft.set(next);
                }
                || ()
            },
            props.data.clone(),
        );
    }

    let status = *save_status;

    let on_save = {
        let draft = draft.clone();
        let save_status = save_status.clone();
        let save_error = save_error.clone();
        let handler = props.save_handler.clone();
        Callback::from(move |_| {
            if !status.can_save() {
                return;
            }
            let payload = draft.to_save_request();
            let save_status = save_status.clone();
            let save_error = save_error.clone();
            let handler = handler.clone();
            save_status.dispatch(SaveAction::Begin);
            save_error.set(None);
            spawn_local(async move {
                match (handler.0)(payload).await {
                    Ok(()) => save_status.dispatch(SaveAction::Succeed),
                    Err(err) => {
                        gloo_console::error!(format!("save failed: {err}"));
                        save_error.set(Some(err.to_string()));
                        save_status.dispatch(SaveAction::Fail);
                        TimeoutFuture::new(SAVE_ERROR_REVERT_MS).await;
                        save_status.dispatch(SaveAction::Revert);
                    }
                }
            });
        })
    };

    let on_reset = {
        let on_reset = props.on_reset.clone();
        Callback::from(move |_| on_reset.emit(()))
    };

    let has_items = !draft.items.is_empty();

    html! {
        <div class="bg-card rounded-xl border border-border p-4">
            <h3 class="text-lg font-bold text-foreground mb-1">{"Recognized receipt"}</h3>
            {
                if status.can_edit() && has_items {
                    html! { <p class="text-xs text-muted-foreground mb-3">{"Tap a value to edit it"}</p> }
                } else {
                    html! {}
                }
            }

            {
                if has_items {
                    html! {
                        <>
                            <div class="overflow-x-auto">
                                <table class="w-full text-left border-collapse">
                                    <thead class="bg-secondary border-b border-border">
                                        <tr>
                                            <th class="px-2 py-2 text-xs font-semibold text-secondary-foreground">{"No"}</th>
                                            <th class="px-2 py-2 text-xs font-semibold text-secondary-foreground">{"Item"}</th>
                                            <th class="px-2 py-2 text-xs font-semibold text-secondary-foreground text-right">{"Unit price"}</th>
                                            <th class="px-2 py-2 text-xs font-semibold text-secondary-foreground text-right">{"Qty"}</th>
                                            <th class="px-2 py-2 text-xs font-semibold text-secondary-foreground text-right">{"Amount"}</th>
                                        </tr>
                                    </thead>
                                    <tbody class="divide-y divide-border">
                                        { for draft.items.iter().enumerate().map(|(index, item)| html! {
                                            <tr key={index} class="text-sm">
                                                <td class="px-2 py-2 text-muted-foreground">{ item.no.clone() }</td>
                                                <td class="px-2 py-2 text-foreground">
                                                    { editable_cell(&draft, &editing, status, index, EditField::Name, item, "cursor-pointer") }
                                                    {
                                                        if let Some(barcode) = &item.barcode {
                                                            html! { <span class="block text-[10px] text-muted-foreground">{ barcode.clone() }</span> }
                                                        } else {
                                                            html! {}
                                                        }
                                                    }
                                                </td>
                                                <td class="px-2 py-2 text-right">
                                                    { editable_cell(&draft, &editing, status, index, EditField::UnitPrice, item, "cursor-pointer") }
                                                </td>
                                                <td class="px-2 py-2 text-right">
                                                    { editable_cell(&draft, &editing, status, index, EditField::Quantity, item, "cursor-pointer") }
                                                </td>
                                                <td class="px-2 py-2 text-right font-semibold">
                                                    { editable_cell(&draft, &editing, status, index, EditField::Amount, item, "cursor-pointer") }
                                                </td>
                                            </tr>
                                        }) }
                                    </tbody>
                                    <tfoot>
                                        <tr class="border-t border-border">
                                            <td colspan="4" class="px-2 py-2 text-sm font-semibold text-right">{"Total"}</td>
                                            <td class="px-2 py-2 text-sm font-bold text-right">{ format_with_commas(draft.total()) }</td>
                                        </tr>
                                    </tfoot>
                                </table>
                            </div>

                            <div class="mt-4 space-y-1 text-sm">
                                {
                                    if let Some(store) = &draft.store_name {
                                        html! {
                                            <div class="flex justify-between">
                                                <span class="text-muted-foreground">{"Store"}</span>
                                                <span class="text-foreground">{ store.clone() }</span>
                                            </div>
                                        }
                                    } else {
                                        html! {}
                                    }
                                }
                                {
                                    if let Some(card) = &draft.card_name {
                                        html! {
                                            <div class="flex justify-between">
                                                <span class="text-muted-foreground">{"Card"}</span>
                                                <span class="text-foreground">{ card.clone() }</span>
                                            </div>
                                        }
                                    } else {
                                        html! {}
                                    }
                                }
                                {
                                    if let Some(datetime) = &draft.purchase_date_time {
                                        html! {
                                            <div class="flex justify-between">
                                                <span class="text-muted-foreground">{"Purchased"}</span>
                                                <span class="text-foreground">{ datetime.clone() }</span>
                                            </div>
                                        }
                                    } else {
                                        html! {}
                                    }
                                }
                            </div>

                            {
                                if !draft.raw_text.is_empty() {
                                    html! {
                                        <details class="mt-4">
                                            <summary class="text-sm text-muted-foreground cursor-pointer">{"Show raw text"}</summary>
                                            <pre class="mt-2 p-3 bg-secondary rounded text-xs whitespace-pre-wrap">{ draft.raw_text.clone() }</pre>
                                        </details>
                                    }
                                } else {
                                    html! {}
                                }
                            }
                        </>
                    }
                } else {
                    html! {
                        <div class="text-center py-6">
                            <p class="text-sm text-muted-foreground">{"No items were recognized."}</p>
                            {
                                if !draft.raw_text.is_empty() {
                                    html! {
                                        <details class="mt-4 text-left">
                                            <summary class="text-sm text-muted-foreground cursor-pointer">{"Show raw text"}</summary>
                                            <pre class="mt-2 p-3 bg-secondary rounded text-xs whitespace-pre-wrap">{ draft.raw_text.clone() }</pre>
                                        </details>
                                    }
                                } else {
                                    html! {}
                                }
                            }
                        </div>
                    }
                }
            }

            {
                if let Some(message) = &*save_error {
                    html! { <p class="text-sm text-red-500 mt-3">{ message.clone() }</p> }
                } else {
                    html! {}
                }
            }

            <div class="flex items-center justify-center gap-3 mt-4">
                {
                    if has_items {
                        html! {
                            <button
                                onclick={on_save}
                                disabled={!status.can_save()}
                                class="bg-primary text-primary-foreground px-6 py-2.5 rounded-xl font-bold text-sm hover:opacity-90 transition-all disabled:opacity-50"
                            >
                                { status.button_label() }
                            </button>
                        }
                    } else {
                        html! {}
                    }
                }
                <button onclick={on_reset} class="bg-secondary text-secondary-foreground px-5 py-2.5 rounded-xl font-medium text-sm hover:opacity-90 transition-all">
                    {"Scan another receipt"}
                </button>
            </div>
        </div>
    }
}

#[function_component(ScanPage)]
fn scan_page() -> Html {
    let captured_image = use_state(|| None::<String>);
    let processing = use_state(|| false);
    let result = use_state(|| None::<OcrResponse>);
    let error = use_state(|| None::<String>);

    let on_capture = {
        let captured_image = captured_image.clone();
        let error = error.clone();
        Callback::from(move |data_url: String| {
            captured_image.set(Some(data_url));
            error.set(None);
        })
    };

    let on_retake = {
        let captured_image = captured_image.clone();
        let error = error.clone();
        Callback::from(move |_| {
            captured_image.set(None);
            error.set(None);
        })
    };

    let on_confirm = {
        let captured_image = captured_image.clone();
        let processing = processing.clone();
        let result = result.clone();
        let error = error.clone();
        Callback::from(move |_| {
            let image = match &*captured_image {
                Some(image) => image.clone(),
                None => return,
            };
            let processing = processing.clone();
            let result = result.clone();
            let error = error.clone();
            processing.set(true);
            error.set(None);
            spawn_local(async move {
                match analyze_receipt(&image).await {
                    Ok(response) => result.set(Some(response)),
                    Err(err) => {
                        gloo_console::error!(format!("analyze failed: {err}"));
                        // the captured image is kept so the user can retry
                        error.set(Some(err.to_string()));
                    }
                }
                processing.set(false);
            });
        })
    };

    let on_reset = {
        let captured_image = captured_image.clone();
        let result = result.clone();
        let error = error.clone();
        Callback::from(move |_| {
            captured_image.set(None);
            result.set(None);
            error.set(None);
        })
    };

    let on_dismiss_error = {
        let error = error.clone();
        Callback::from(move |_| error.set(None))
    };

    let save_handler = SaveHandler(Rc::new(|payload: SaveReceiptRequest| {
        Box::pin(async move { save_receipt(&payload).await }) as SaveFuture
    }));

    html! {
        <div class="relative">
            {
                if *processing {
                    html! {
                        <div class="fixed inset-0 bg-black/60 flex flex-col items-center justify-center z-50">
                            <div class="w-10 h-10 border-4 border-white/30 border-t-white rounded-full animate-spin"></div>
                            <p class="mt-4 text-white text-sm">{"Analyzing receipt..."}</p>
                        </div>
                    }
                } else {
                    html! {}
                }
            }

            {
                if let Some(message) = &*error {
                    html! {
                        <div class="flex items-center justify-between bg-red-50 border border-red-200 text-red-700 px-4 py-3 rounded-lg mb-4">
                            <span class="text-sm">{ message.clone() }</span>
                            <button onclick={on_dismiss_error} class="ml-4 hover:text-red-900">
                                { icon_x() }
                            </button>
                        </div>
                    }
                } else {
                    html! {}
                }
            }

            {
                if let Some(data) = &*result {
                    html! { <ResultTable data={data.clone()} on_reset={on_reset} save_handler={save_handler} /> }
                } else if let Some(image) = &*captured_image {
                    html! { <ImagePreview image_data={image.clone()} on_retake={on_retake} on_confirm={on_confirm} /> }
                } else {
                    html! { <CameraCapture on_capture={on_capture} /> }
                }
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct DateRangeBarProps {
    start_date: NaiveDate,
    end_date: NaiveDate,
    on_change: Callback<(NaiveDate, NaiveDate)>,
}

#[function_component(DateRangeBar)]
fn date_range_bar(props: &DateRangeBarProps) -> Html {
    let on_start_change = {
        let end_date = props.end_date;
        let on_change = props.on_change.clone();
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                if let Ok(date) = NaiveDate::parse_from_str(&input.value(), "%Y-%m-%d") {
                    on_change.emit((date, end_date));
                }
            }
        })
    };

    let on_end_change = {
        let start_date = props.start_date;
        let on_change = props.on_change.clone();
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                if let Ok(date) = NaiveDate::parse_from_str(&input.value(), "%Y-%m-%d") {
                    on_change.emit((start_date, date));
                }
            }
        })
    };

    html! {
        <div class="bg-card rounded-xl border border-border p-4 mb-4">
            <div class="flex items-center gap-2">
                <div class="flex-1">
                    <label class="block text-xs text-muted-foreground mb-1">{"From"}</label>
                    <input
                        type="date"
                        value={props.start_date.format("%Y-%m-%d").to_string()}
                        onchange={on_start_change}
                        class="w-full px-3 py-2 bg-input border border-input rounded-lg text-sm text-foreground focus:outline-none focus:ring-2 focus:ring-primary"
                    />
                </div>
                <span class="text-muted-foreground pt-5">{"~"}</span>
                <div class="flex-1">
                    <label class="block text-xs text-muted-foreground mb-1">{"To"}</label>
                    <input
                        type="date"
                        value={props.end_date.format("%Y-%m-%d").to_string()}
                        onchange={on_end_change}
                        class="w-full px-3 py-2 bg-input border border-input rounded-lg text-sm text-foreground focus:outline-none focus:ring-2 focus:ring-primary"
                    />
                </div>
            </div>
            <div class="flex gap-2 mt-3">
                { for QuickRange::ALL.iter().map(|range| {
                    let range = *range;
                    let on_change = props.on_change.clone();
                    html! {
                        <button
                            type="button"
                            onclick={Callback::from(move |_| on_change.emit(range.bounds(today())))}
                            class="flex-1 px-2 py-1.5 bg-secondary text-secondary-foreground rounded-lg text-xs font-medium hover:opacity-90 transition-all"
                        >
                            { range.label() }
                        </button>
                    }
                }) }
            </div>
        </div>
    }
}

fn percent_of(amount: i64, total: i64) -> String {
    if total <= 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", amount as f64 / total as f64 * 100.0)
}

#[function_component(DashboardPage)]
fn dashboard_page() -> Html {
    let (default_start, default_end) = QuickRange::ThisMonth.bounds(today());
    let start_date = use_state(|| default_start);
    let end_date = use_state(|| default_end);

    let summary = use_state(StatsSummary::default);
    let monthly = use_state(Vec::<MonthlyStat>::new);
    let store_stats = use_state(Vec::<StoreStat>::new);
    let card_stats = use_state(Vec::<CardStat>::new);
    let frequent = use_state(Vec::<FrequentItem>::new);
    let loading = use_state(|| true);
    let error = use_state(|| None::<String>);

    // per-store drill-down, fetched lazily when a store row is expanded
    let selected_store = use_state(|| None::<String>);
    let store_cards = use_state(Vec::<CardStat>::new);
    let store_cards_loading = use_state(|| false);

    {
        let summary = summary.clone();
        let monthly = monthly.clone();
        let store_stats = store_stats.clone();
        let card_stats = card_stats.clone();
        let frequent = frequent.clone();
        let loading = loading.clone();
        let error = error.clone();
        let selected_store = selected_store.clone();
        let store_cards = store_cards.clone();

        use_effect_with_deps(
            move |range: &(NaiveDate, NaiveDate)| {
                let (start, end) = *range;
                selected_store.set(None);
                store_cards.set(Vec::new());
                loading.set(true);
                error.set(None);
                spawn_local(async move {
                    match fetch_summary(start, end).await {
                        Ok(data) => summary.set(data),
                        Err(err) => {
                            gloo_console::error!(format!("summary stats failed: {err}"));
                            error.set(Some(err.to_string()));
                        }
                    }
                    match fetch_monthly_stats(start, end).await {
                        Ok(data) => monthly.set(data),
                        Err(err) => {
                            gloo_console::error!(format!("monthly stats failed: {err}"));
                            error.set(Some(err.to_string()));
                        }
                    }
                    match fetch_store_stats(start, end).await {
                        Ok(data) => store_stats.set(data),
                        Err(err) => {
                            gloo_console::error!(format!("store stats failed: {err}"));
                            error.set(Some(err.to_string()));
                        }
                    }
                    match fetch_card_stats(start, end).await {
                        Ok(data) => card_stats.set(data),
                        Err(err) => {
                            gloo_console::error!(format!("card stats failed: {err}"));
                            error.set(Some(err.to_string()));
                        }
                    }
                    match fetch_frequent_items(start, end, FREQUENT_ITEMS_LIMIT).await {
                        Ok(data) => frequent.set(data),
                        Err(err) => {
                            gloo_console::error!(format!("frequent items failed: {err}"));
                            error.set(Some(err.to_string()));
                        }
                    }
                    loading.set(false);
                });
                || ()
            },
            (*start_date, *end_date),
        );
    }

    let on_range_change = {
        let start_date = start_date.clone();
        let end_date = end_date.clone();
        Callback::from(move |(start, end): (NaiveDate, NaiveDate)| {
            start_date.set(start);
            end_date.set(end);
        })
    };

    let on_dismiss_error = {
        let error = error.clone();
        Callback::from(move |_| error.set(None))
    };

    let on_store_click = {
        let selected_store = selected_store.clone();
        let store_cards = store_cards.clone();
        let store_cards_loading = store_cards_loading.clone();
        let start_date = start_date.clone();
        let end_date = end_date.clone();
        Callback::from(move |store_name: String| {
            // clicking the open store again collapses the drill-down
            if (*selected_store).as_deref() == Some(store_name.as_str()) {
                selected_store.set(None);
                store_cards.set(Vec::new());
                return;
            }
            selected_store.set(Some(store_name.clone()));
            store_cards_loading.set(true);
            let store_cards = store_cards.clone();
            let store_cards_loading = store_cards_loading.clone();
            let start = *start_date;
            let end = *end_date;
            spawn_local(async move {
                match fetch_store_card_stats(&store_name, start, end).await {
                    Ok(cards) => store_cards.set(cards),
                    Err(err) => {
                        gloo_console::error!(format!("store card stats failed: {err}"));
                        store_cards.set(Vec::new());
                    }
                }
                store_cards_loading.set(false);
            });
        })
    };

    let max_month = monthly.iter().map(|stat| stat.total_amount).max().unwrap_or(0);
    let total_amount = summary.total_amount;

    html! {
        <div>
            <DateRangeBar start_date={*start_date} end_date={*end_date} on_change={on_range_change} />

            {
                if let Some(message) = &*error {
                    html! {
                        <div class="flex items-center justify-between bg-red-50 border border-red-200 text-red-700 px-4 py-3 rounded-lg mb-4">
                            <span class="text-sm">{ message.clone() }</span>
                            <button onclick={on_dismiss_error} class="ml-4 hover:text-red-900">
                                { icon_x() }
                            </button>
                        </div>
                    }
                } else {
                    html! {}
                }
            }

            {
                if *loading {
                    html! { <div class="text-center py-10 text-muted-foreground">{"Loading..."}</div> }
                } else {
                    html! {
                        <>
                            <div class="grid grid-cols-3 gap-3 mb-4">
                                <div class="bg-card rounded-xl p-4 border border-border">
                                    <p class="text-xs text-muted-foreground mb-1">{"Total spent"}</p>
                                    <h3 class="text-lg font-bold text-foreground">{ format_currency(summary.total_amount) }</h3>
                                </div>
                                <div class="bg-card rounded-xl p-4 border border-border">
                                    <p class="text-xs text-muted-foreground mb-1">{"Receipts"}</p>
                                    <h3 class="text-lg font-bold text-foreground">{ summary.receipt_count }</h3>
                                </div>
                                <div class="bg-card rounded-xl p-4 border border-border">
                                    <p class="text-xs text-muted-foreground mb-1">{"Average"}</p>
                                    <h3 class="text-lg font-bold text-foreground">{ format_currency(summary.avg_amount) }</h3>
                                </div>
                            </div>

                            {
                                if !monthly.is_empty() {
                                    html! {
                                        <div class="bg-card rounded-xl border border-border p-4 mb-4">
                                            <h3 class="font-bold text-foreground mb-3">{"Monthly spending"}</h3>
                                            <div class="space-y-2">
                                                { for monthly.iter().map(|stat| {
                                                    let width = if max_month > 0 { stat.total_amount * 100 / max_month } else { 0 };
                                                    html! {
                                                        <div class="flex items-center gap-2 text-sm" title={format!("{} receipts", stat.receipt_count)}>
                                                            <span class="w-16 text-muted-foreground">{ stat.month.clone() }</span>
                                                            <div class="flex-1 h-4 bg-secondary rounded overflow-hidden">
                                                                <div class="h-full bg-primary rounded" style={format!("width: {}%", width)}></div>
                                                            </div>
                                                            <span class="w-24 text-right font-semibold text-foreground">{ format_currency(stat.total_amount) }</span>
                                                        </div>
                                                    }
                                                }) }
                                            </div>
                                        </div>
                                    }
                                } else {
                                    html! {}
                                }
                            }

                            {
                                if !store_stats.is_empty() {
                                    html! {
                                        <div class="bg-card rounded-xl border border-border p-4 mb-4">
                                            <h3 class="font-bold text-foreground mb-3">{"Spending by store"}</h3>
                                            <div class="divide-y divide-border">
                                                { for store_stats.iter().enumerate().map(|(rank, store)| {
                                                    let is_open = (*selected_store).as_deref() == Some(store.store_name.as_str());
                                                    let on_store_click = on_store_click.clone();
                                                    let store_name = store.store_name.clone();
                                                    html! {
                                                        <div key={store.store_name.clone()}>
                                                            <div
                                                                onclick={Callback::from(move |_| on_store_click.emit(store_name.clone()))}
                                                                class={if is_open { "flex items-center gap-3 py-3 cursor-pointer bg-secondary/50 px-2 rounded-lg" } else { "flex items-center gap-3 py-3 cursor-pointer px-2" }}
                                                            >
                                                                <span class="w-6 h-6 flex items-center justify-center bg-secondary rounded-full text-xs font-bold text-secondary-foreground">{ rank + 1 }</span>
                                                                <div class="flex-1">
                                                                    <p class="text-sm font-semibold text-foreground">{ store.store_name.clone() }</p>
                                                                    <p class="text-xs text-muted-foreground">{ format!("{} visits", store.visit_count) }</p>
                                                                </div>
                                                                <div class="text-right">
                                                                    <p class="text-sm font-bold text-foreground">{ format_currency(store.total_amount) }</p>
                                                                    <p class="text-xs text-muted-foreground">{ percent_of(store.total_amount, total_amount) }</p>
                                                                </div>
                                                                <span class="text-muted-foreground text-xs">{ if is_open { "▼" } else { "▶" } }</span>
                                                            </div>
                                                            {
                                                                if is_open {
                                                                    html! {
                                                                        <div class="pl-11 pb-3">
                                                                            {
                                                                                if *store_cards_loading {
                                                                                    html! { <p class="text-xs text-muted-foreground">{"Loading..."}</p> }
                                                                                } else if store_cards.is_empty() {
                                                                                    html! { <p class="text-xs text-muted-foreground">{"No card data."}</p> }
                                                                                } else {
                                                                                    html! {
                                                                                        <div class="space-y-1">
                                                                                            <p class="text-xs font-semibold text-muted-foreground">{"Payments by card"}</p>
                                                                                            { for store_cards.iter().map(|card| html! {
                                                                                                <div class="flex items-center justify-between text-xs">
                                                                                                    <span class="text-foreground">{ card.card_name.clone() }</span>
                                                                                                    <span class="text-muted-foreground">{ format!("{}x", card.usage_count) }</span>
                                                                                                    <span class="font-semibold text-foreground">{ format_currency(card.total_amount) }</span>
                                                                                                </div>
                                                                                            }) }
                                                                                        </div>
                                                                                    }
                                                                                }
                                                                            }
                                                                        </div>
                                                                    }
                                                                } else {
                                                                    html! {}
                                                                }
                                                            }
                                                        </div>
                                                    }
                                                }) }
                                            </div>
                                        </div>
                                    }
                                } else {
                                    html! {}
                                }
                            }

                            {
                                if !card_stats.is_empty() {
                                    html! {
                                        <div class="bg-card rounded-xl border border-border p-4 mb-4">
                                            <h3 class="font-bold text-foreground mb-3">{"Spending by card"}</h3>
                                            <div class="space-y-2">
                                                { for card_stats.iter().map(|card| html! {
                                                    <div class="flex items-center justify-between text-sm">
                                                        <span class="text-foreground">{ card.card_name.clone() }</span>
                                                        <span class="text-xs text-muted-foreground">{ format!("{} payments", card.usage_count) }</span>
                                                        <span class="font-semibold text-foreground">{ format_currency(card.total_amount) }</span>
                                                    </div>
                                                }) }
                                            </div>
                                        </div>
                                    }
                                } else {
                                    html! {}
                                }
                            }

                            {
                                if !frequent.is_empty() {
                                    html! {
                                        <div class="bg-card rounded-xl border border-border overflow-hidden mb-4">
                                            <div class="px-4 py-3 border-b border-border">
                                                <h3 class="font-bold text-foreground">{"Frequently bought"}</h3>
                                            </div>
                                            <div class="overflow-x-auto">
                                                <table class="w-full text-left border-collapse">
                                                    <thead class="bg-secondary border-b border-border">
                                                        <tr>
                                                            <th class="px-3 py-2 text-xs font-semibold text-secondary-foreground">{"#"}</th>
                                                            <th class="px-3 py-2 text-xs font-semibold text-secondary-foreground">{"Item"}</th>
                                                            <th class="px-3 py-2 text-xs font-semibold text-secondary-foreground text-right">{"Times"}</th>
                                                            <th class="px-3 py-2 text-xs font-semibold text-secondary-foreground text-right">{"Total"}</th>
                                                            <th class="px-3 py-2 text-xs font-semibold text-secondary-foreground text-right">{"Cycle"}</th>
                                                        </tr>
                                                    </thead>
                                                    <tbody class="divide-y divide-border">
                                                        { for frequent.iter().enumerate().map(|(rank, item)| html! {
                                                            <tr key={rank} class="text-sm">
                                                                <td class="px-3 py-2 text-muted-foreground">{ rank + 1 }</td>
                                                                <td class="px-3 py-2 text-foreground">{ item.name.clone() }</td>
                                                                <td class="px-3 py-2 text-right">{ item.purchase_count }</td>
                                                                <td class="px-3 py-2 text-right font-semibold">{ format_currency(item.total_amount) }</td>
                                                                <td class="px-3 py-2 text-right text-muted-foreground">
                                                                    { match item.avg_interval_days {
                                                                        Some(days) => format!("{} days", days),
                                                                        None => "-".to_string(),
                                                                    } }
                                                                </td>
                                                            </tr>
                                                        }) }
                                                    </tbody>
                                                </table>
                                            </div>
                                        </div>
                                    }
                                } else {
                                    html! {}
                                }
                            }

                            {
                                if monthly.is_empty() && store_stats.is_empty() {
                                    html! {
                                        <div class="text-center py-10 text-muted-foreground">
                                            <p>{"No data for the selected period."}</p>
                                            <p class="text-sm mt-1">{"Scan and save a receipt to get started."}</p>
                                        </div>
                                    }
                                } else {
                                    html! {}
                                }
                            }
                        </>
                    }
                }
            }
        </div>
    }
}

struct DateBadge {
    day: String,
    month: String,
    time: String,
}

fn parse_purchase_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, "%y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%y-%m-%d %H:%M:%S"))
        .ok()
}

fn date_badge(raw: Option<&str>) -> DateBadge {
    match raw.and_then(parse_purchase_datetime) {
        Some(datetime) => DateBadge {
            day: datetime.format("%d").to_string(),
            month: datetime.format("%b").to_string(),
            time: datetime.format("%H:%M").to_string(),
        },
        None => DateBadge {
            day: "-".to_string(),
            month: "-".to_string(),
            time: String::new(),
        },
    }
}

fn format_purchase_datetime(raw: Option<&str>) -> String {
    match raw.and_then(parse_purchase_datetime) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M").to_string(),
        None => raw.unwrap_or("-").to_string(),
    }
}

#[function_component(ReceiptListPage)]
fn receipt_list_page() -> Html {
    let (default_start, default_end) = QuickRange::ThisMonth.bounds(today());
    let start_date = use_state(|| default_start);
    let end_date = use_state(|| default_end);
    let store_filter = use_state(String::new);
    let card_filter = use_state(String::new);
    let search = use_state(String::new);
    let refresh = use_state(|| 0u32);

    let receipts = use_state(Vec::<ReceiptSummary>::new);
    let loading = use_state(|| true);
    let error = use_state(|| None::<String>);

    let selected = use_state(|| None::<ReceiptSummary>);
    let detail = use_state(|| None::<ReceiptDetailResponse>);
    let detail_loading = use_state(|| false);

    {
        let receipts = receipts.clone();
        let loading = loading.clone();
        let error = error.clone();

        use_effect_with_deps(
            move |deps: &(NaiveDate, NaiveDate, String, String, String, u32)| {
                let (start, end, store, card, text, _) = deps.clone();
                loading.set(true);
                error.set(None);
                let query = ReceiptQuery {
                    limit: LIST_LIMIT,
                    start_date: Some(start),
                    end_date: Some(end),
                    store_name: if store.is_empty() { None } else { Some(store) },
                    card_name: if card.is_empty() { None } else { Some(card) },
                    search: if text.is_empty() { None } else { Some(text) },
                };
                spawn_local(async move {
                    match fetch_receipts(&query).await {
                        Ok(list) => receipts.set(list),
                        Err(err) => {
                            gloo_console::error!(format!("receipt list failed: {err}"));
                            error.set(Some(err.to_string()));
                        }
                    }
                    loading.set(false);
                });
                || ()
            },
            (
                *start_date,
                *end_date,
                (*store_filter).clone(),
                (*card_filter).clone(),
                (*search).clone(),
                *refresh,
            ),
        );
    }

    let on_range_change = {
        let start_date = start_date.clone();
        let end_date = end_date.clone();
        Callback::from(move |(start, end): (NaiveDate, NaiveDate)| {
            start_date.set(start);
            end_date.set(end);
        })
    };

    let on_search_input = {
        let search = search.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                search.set(input.value());
            }
        })
    };

    let on_store_change = {
        let store_filter = store_filter.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            store_filter.set(select.value());
        })
    };

    let on_card_change = {
        let card_filter = card_filter.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            card_filter.set(select.value());
        })
    };

    let on_clear_filters = {
        let start_date = start_date.clone();
        let end_date = end_date.clone();
        let store_filter = store_filter.clone();
        let card_filter = card_filter.clone();
        let search = search.clone();
        Callback::from(move |_| {
            let (start, end) = QuickRange::ThisMonth.bounds(today());
            start_date.set(start);
            end_date.set(end);
            store_filter.set(String::new());
            card_filter.set(String::new());
            search.set(String::new());
        })
    };

    let on_receipt_click = {
        let selected = selected.clone();
        let detail = detail.clone();
        let detail_loading = detail_loading.clone();
        Callback::from(move |receipt: ReceiptSummary| {
            let id = receipt.id;
            selected.set(Some(receipt));
            detail.set(None);
            detail_loading.set(true);
            let detail = detail.clone();
            let detail_loading = detail_loading.clone();
            spawn_local(async move {
                match fetch_receipt_detail(id).await {
                    Ok(data) => detail.set(Some(data)),
                    Err(err) => {
                        gloo_console::error!(format!("receipt detail failed: {err}"));
                        detail.set(None);
                    }
                }
                detail_loading.set(false);
            });
        })
    };

    let on_close_modal = {
        let selected = selected.clone();
        let detail = detail.clone();
        Callback::from(move |_| {
            // closing discards the fetched detail
            selected.set(None);
            detail.set(None);
        })
    };

    let on_delete = {
        let selected = selected.clone();
        let detail = detail.clone();
        let refresh = refresh.clone();
        let error = error.clone();
        Callback::from(move |id: i64| {
            let selected = selected.clone();
            let detail = detail.clone();
            let refresh = refresh.clone();
            let error = error.clone();
            spawn_local(async move {
                match delete_receipt(id).await {
                    Ok(()) => {
                        selected.set(None);
                        detail.set(None);
                        refresh.set(*refresh + 1);
                    }
                    Err(err) => {
                        gloo_console::error!(format!("delete failed: {err}"));
                        error.set(Some(err.to_string()));
                    }
                }
            });
        })
    };

    let on_dismiss_error = {
        let error = error.clone();
        Callback::from(move |_| error.set(None))
    };

    // filter options come from the distinct values of the current page
    let mut store_options: Vec<String> = receipts
        .iter()
        .filter_map(|receipt| receipt.store_name.clone())
        .filter(|name| !name.is_empty())
        .collect();
    store_options.sort();
    store_options.dedup();

    let mut card_options: Vec<String> = receipts
        .iter()
        .filter_map(|receipt| receipt.card_name.clone())
        .filter(|name| !name.is_empty())
        .collect();
    card_options.sort();
    card_options.dedup();

    let no_filters = store_filter.is_empty() && card_filter.is_empty() && search.is_empty();

    html! {
        <div>
            <DateRangeBar start_date={*start_date} end_date={*end_date} on_change={on_range_change} />

            <div class="mb-3">
                <input
                    type="text"
                    placeholder="Search items..."
                    value={(*search).clone()}
                    oninput={on_search_input}
                    class="w-full px-4 py-2.5 bg-input border border-input rounded-lg text-sm text-foreground focus:outline-none focus:ring-2 focus:ring-primary"
                />
            </div>

            <div class="flex gap-2 mb-4">
                <select
                    value={(*store_filter).clone()}
                    onchange={on_store_change}
                    class="flex-1 px-3 py-2.5 bg-input border border-input rounded-lg text-sm text-foreground focus:outline-none focus:ring-2 focus:ring-primary"
                >
                    <option value="">{"All stores"}</option>
                    { for store_options.iter().map(|store| html! {
                        <option value={store.clone()}>{ store.clone() }</option>
                    }) }
                </select>
                <select
                    value={(*card_filter).clone()}
                    onchange={on_card_change}
                    class="flex-1 px-3 py-2.5 bg-input border border-input rounded-lg text-sm text-foreground focus:outline-none focus:ring-2 focus:ring-primary"
                >
                    <option value="">{"All cards"}</option>
                    { for card_options.iter().map(|card| html! {
                        <option value={card.clone()}>{ card.clone() }</option>
                    }) }
                </select>
                <button
                    type="button"
                    onclick={on_clear_filters}
                    disabled={no_filters}
                    class="px-4 py-2.5 bg-secondary text-secondary-foreground rounded-lg text-sm font-medium hover:opacity-90 transition-all disabled:opacity-50"
                >
                    {"Clear"}
                </button>
            </div>

            {
                if let Some(message) = &*error {
                    html! {
                        <div class="flex items-center justify-between bg-red-50 border border-red-200 text-red-700 px-4 py-3 rounded-lg mb-4">
                            <span class="text-sm">{ message.clone() }</span>
                            <button onclick={on_dismiss_error} class="ml-4 hover:text-red-900">
                                { icon_x() }
                            </button>
                        </div>
                    }
                } else {
                    html! {}
                }
            }

            <div class="bg-card rounded-xl border border-border p-4">
                <h3 class="font-bold text-foreground mb-3">{"Saved receipts"}</h3>
                {
                    if *loading {
                        html! { <div class="text-center py-8 text-muted-foreground">{"Loading..."}</div> }
                    } else if receipts.is_empty() {
                        html! {
                            <div class="text-center py-8 text-muted-foreground">
                                <p>{"No receipts found."}</p>
                                <p class="text-sm mt-1">{"Scan and save a receipt to get started."}</p>
                            </div>
                        }
                    } else {
                        html! {
                            <div class="divide-y divide-border">
                                { for receipts.iter().map(|receipt| {
                                    let badge = date_badge(receipt.purchase_datetime.as_deref());
                                    let on_receipt_click = on_receipt_click.clone();
                                    let row = receipt.clone();
                                    html! {
                                        <div
                                            key={receipt.id.to_string()}
                                            onclick={Callback::from(move |_| on_receipt_click.emit(row.clone()))}
                                            class="flex items-center gap-3 py-3 cursor-pointer hover:bg-muted/30 transition-colors px-2"
                                        >
                                            <div class="w-12 text-center bg-secondary rounded-lg py-1">
                                                <div class="text-lg font-bold text-foreground leading-tight">{ badge.day }</div>
                                                <div class="text-[10px] text-muted-foreground uppercase">{ badge.month }</div>
                                            </div>
                                            <div class="flex-1">
                                                <p class="text-sm font-semibold text-foreground">
                                                    { receipt.store_name.clone().unwrap_or_else(|| "Unknown store".to_string()) }
                                                </p>
                                                <p class="text-xs text-muted-foreground">
                                                    { badge.time }
                                                    {
                                                        if let Some(card) = &receipt.card_name {
                                                            html! { <span class="ml-2">{ card.clone() }</span> }
                                                        } else {
                                                            html! {}
                                                        }
                                                    }
                                                </p>
                                            </div>
                                            <div class="text-sm font-bold text-foreground">{ format_currency(receipt.total_amount) }</div>
                                            <span class="text-muted-foreground text-xs">{"▶"}</span>
                                        </div>
                                    }
                                }) }
                            </div>
                        }
                    }
                }
            </div>

            {
                if let Some(receipt) = &*selected {
                    let receipt_id = receipt.id;
                    let on_delete = on_delete.clone();
                    html! {
                        <div class="fixed inset-0 bg-black/50 flex items-center justify-center z-50 p-4" onclick={on_close_modal.clone()}>
                            <div
                                class="bg-white rounded-xl max-w-lg w-full max-h-[80vh] overflow-y-auto p-5 relative"
                                onclick={Callback::from(|e: MouseEvent| e.stop_propagation())}
                            >
                                <button onclick={on_close_modal.clone()} class="absolute top-3 right-3 text-muted-foreground hover:text-foreground">
                                    { icon_x() }
                                </button>

                                {
                                    if *detail_loading {
                                        html! { <div class="text-center py-10 text-muted-foreground">{"Loading..."}</div> }
                                    } else if let Some(data) = &*detail {
                                        let receipt_row = data.receipt.clone();
                                        html! {
                                            <>
                                                <div class="pb-3 border-b border-border">
                                                    <h2 class="text-lg font-bold text-foreground">
                                                        { receipt_row.as_ref().and_then(|r| r.store_name.clone()).unwrap_or_else(|| "Receipt".to_string()) }
                                                    </h2>
                                                    <div class="flex justify-between text-sm mt-2">
                                                        <span class="text-muted-foreground">{"Purchased"}</span>
                                                        <span class="text-foreground">
                                                            { format_purchase_datetime(receipt_row.as_ref().and_then(|r| r.purchase_datetime.as_deref())) }
                                                        </span>
                                                    </div>
                                                    <div class="flex justify-between text-sm mt-1">
                                                        <span class="text-muted-foreground">{"Paid with"}</span>
                                                        <span class="text-foreground">
                                                            { receipt_row.as_ref().and_then(|r| r.card_name.clone()).unwrap_or_else(|| "-".to_string()) }
                                                        </span>
                                                    </div>
                                                </div>

                                                <div class="overflow-x-auto mt-3">
                                                    <table class="w-full text-left border-collapse">
                                                        <thead class="bg-secondary border-b border-border">
                                                            <tr>
                                                                <th class="px-2 py-2 text-xs font-semibold text-secondary-foreground">{"No"}</th>
                                                                <th class="px-2 py-2 text-xs font-semibold text-secondary-foreground">{"Item"}</th>
                                                                <th class="px-2 py-2 text-xs font-semibold text-secondary-foreground text-right">{"Unit price"}</th>
                                                                <th class="px-2 py-2 text-xs font-semibold text-secondary-foreground text-right">{"Qty"}</th>
                                                                <th class="px-2 py-2 text-xs font-semibold text-secondary-foreground text-right">{"Amount"}</th>
                                                            </tr>
                                                        </thead>
                                                        <tbody class="divide-y divide-border">
                                                            { for data.items.iter().enumerate().map(|(index, item)| html! {
                                                                <tr key={index} class="text-sm">
                                                                    <td class="px-2 py-2 text-muted-foreground">{ item.no.clone() }</td>
                                                                    <td class="px-2 py-2 text-foreground">{ item.name.clone() }</td>
                                                                    <td class="px-2 py-2 text-right">{ format_currency(item.unit_price) }</td>
                                                                    <td class="px-2 py-2 text-right">{ item.quantity }</td>
                                                                    <td class="px-2 py-2 text-right font-semibold">{ format_currency(item.amount) }</td>
                                                                </tr>
                                                            }) }
                                                        </tbody>
                                                    </table>
                                                </div>

                                                <div class="flex items-center justify-between mt-4 pt-3 border-t border-border">
                                                    <span class="text-sm font-semibold text-foreground">{"Total paid"}</span>
                                                    <span class="text-lg font-bold text-foreground">
                                                        { format_currency(receipt_row.as_ref().map(|r| r.total_amount).unwrap_or(0)) }
                                                    </span>
                                                </div>

                                                <div class="mt-4 text-right">
                                                    <button
                                                        onclick={Callback::from(move |_| on_delete.emit(receipt_id))}
                                                        class="inline-flex items-center gap-2 text-sm text-red-600 hover:text-red-800"
                                                    >
                                                        { icon_trash() }
                                                        {"Delete receipt"}
                                                    </button>
                                                </div>
                                            </>
                                        }
                                    } else {
                                        html! { <div class="text-center py-10 text-muted-foreground">{"Could not load the receipt detail."}</div> }
                                    }
                                }
                            </div>
                        </div>
                    }
                } else {
                    html! {}
                }
            }
        </div>
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Page {
    Scan,
    Dashboard,
    Receipts,
}

impl Page {
    fn title(self) -> &'static str {
        match self {
            Page::Scan => "Receipt Scanner",
            Page::Dashboard => "Dashboard",
            Page::Receipts => "Receipts",
        }
    }
}

struct NavItem {
    label: &'static str,
    page: Page,
    icon: fn() -> Html,
}

#[derive(Properties, PartialEq)]
struct NavigationProps {
    active_page: Page,
    on_select: Callback<Page>,
}

#[function_component(Navigation)]
fn navigation(props: &NavigationProps) -> Html {
    let nav_items = vec![
        NavItem {
            label: "Scan",
            page: Page::Scan,
            icon: icon_camera,
        },
        NavItem {
            label: "Dashboard",
            page: Page::Dashboard,
            icon: icon_bar_chart,
        },
        NavItem {
            label: "Receipts",
            page: Page::Receipts,
            icon: icon_receipt,
        },
    ];

    html! {
        <nav class="fixed bottom-0 inset-x-0 bg-card border-t border-border flex z-40">
            { for nav_items.iter().map(|item| {
                let is_active = item.page == props.active_page;
                let class_name = if is_active {
                    "flex-1 flex flex-col items-center gap-1 py-2.5 text-primary font-semibold"
                } else {
                    "flex-1 flex flex-col items-center gap-1 py-2.5 text-muted-foreground hover:text-foreground"
                };
                let on_select = props.on_select.clone();
                let page = item.page;

                html! {
                    <button type="button" class={class_name} onclick={Callback::from(move |_| on_select.emit(page))}>
                        <span>{ (item.icon)() }</span>
                        <span class="text-[11px]">{ item.label }</span>
                    </button>
                }
            }) }
        </nav>
    }
}

fn fullscreen_active() -> bool {
    web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.fullscreen_element())
        .is_some()
}

fn fullscreen_supported() -> bool {
    let window = match web_sys::window() {
        Some(window) => window,
        None => return false,
    };
    if !window.is_secure_context() {
        return false;
    }
    match window.document().and_then(|document| document.document_element()) {
        Some(root) => {
            js_sys::Reflect::has(root.as_ref(), &JsValue::from_str("requestFullscreen"))
                .unwrap_or(false)
        }
        None => false,
    }
}

fn toggle_fullscreen() {
    if let Some(document) = web_sys::window().and_then(|window| window.document()) {
        if document.fullscreen_element().is_some() {
            document.exit_fullscreen();
        } else if let Some(root) = document.document_element() {
            let _ = root.request_fullscreen();
        }
    }
}

#[function_component(App)]
fn app() -> Html {
    let active_page = use_state(|| Page::Scan);
    let is_fullscreen = use_state(|| false);
    let backend_down = use_state(|| false);
    let show_fullscreen = fullscreen_supported();

    let on_select = {
        let active_page = active_page.clone();
        Callback::from(move |page: Page| active_page.set(page))
    };

    {
        // startup liveness probe
        let backend_down = backend_down.clone();
        use_effect_with_deps(
            move |_| {
                spawn_local(async move {
                    if let Err(err) = check_health().await {
                        gloo_console::error!(format!("health check failed: {err}"));
                        backend_down.set(true);
                    }
                });
                || ()
            },
            (),
        );
    }

    {
        // Esc leaves fullscreen without going through the button, so the
        // state tracks the document instead of the toggle.
        let is_fullscreen = is_fullscreen.clone();
        use_effect_with_deps(
            move |_| {
                let on_change = Closure::<dyn FnMut()>::new(move || {
                    is_fullscreen.set(fullscreen_active());
                });
                if let Some(document) = web_sys::window().and_then(|window| window.document()) {
                    let _ = document.add_event_listener_with_callback(
                        "fullscreenchange",
                        on_change.as_ref().unchecked_ref(),
                    );
                }
                move || {
                    if let Some(document) = web_sys::window().and_then(|window| window.document())
                    {
                        let _ = document.remove_event_listener_with_callback(
                            "fullscreenchange",
                            on_change.as_ref().unchecked_ref(),
                        );
                    }
                }
            },
            (),
        );
    }

    let on_toggle_fullscreen = Callback::from(|_| toggle_fullscreen());

    let content = match *active_page {
        Page::Scan => html! { <ScanPage /> },
        Page::Dashboard => html! { <DashboardPage /> },
        Page::Receipts => html! { <ReceiptListPage /> },
    };

    html! {
        <div class="min-h-screen bg-background">
            <header class="bg-card border-b border-border h-14 flex items-center justify-center relative px-4">
                {
                    if show_fullscreen {
                        html! {
                            <button
                                onclick={on_toggle_fullscreen}
                                aria-label={if *is_fullscreen { "Exit fullscreen" } else { "Fullscreen" }}
                                class="absolute left-4 p-2 hover:bg-secondary rounded-full transition-colors text-muted-foreground"
                            >
                                { if *is_fullscreen { icon_x() } else { icon_maximize() } }
                            </button>
                        }
                    } else {
                        html! {}
                    }
                }
                <h1 class="text-lg font-bold text-foreground">{ active_page.title() }</h1>
            </header>

            {
                if *backend_down {
                    html! {
                        <div class="bg-amber-50 border-b border-amber-200 text-amber-800 text-sm text-center px-4 py-2">
                            {"The backend is unreachable. Saved data and analysis are unavailable."}
                        </div>
                    }
                } else {
                    html! {}
                }
            }

            <main class="max-w-2xl mx-auto p-4 pb-24">
                { content }
            </main>

            <Navigation active_page={*active_page} on_select={on_select} />
        </div>
    }
}

fn format_with_commas(value: i64) -> String {
    let is_negative = value < 0;
    let s = value.abs().to_string().chars().rev().collect::<Vec<char>>();
    let mut out = Vec::new();
    for (i, ch) in s.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(*ch);
    }
    let formatted: String = out.into_iter().rev().collect();
    if is_negative {
        format!("-{}", formatted)
    } else {
        formatted
    }
}

fn format_currency(amount: i64) -> String {
    format!("₩{}", format_with_commas(amount))
}

fn icon_base(path: &'static str) -> Html {
    html! {
        <svg width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round">
            <path d={path}></path>
        </svg>
    }
}

fn icon_camera() -> Html {
    icon_base("M23 19a2 2 0 01-2 2H3a2 2 0 01-2-2V8a2 2 0 012-2h4l2-3h6l2 3h4a2 2 0 012 2zM12 17a4 4 0 100-8 4 4 0 000 8z")
}
fn icon_bar_chart() -> Html {
    icon_base("M4 20V10M10 20V4M16 20v-6M22 20H2")
}
fn icon_receipt() -> Html {
    icon_base("M4 2v20l2-1 2 1 2-1 2 1 2-1 2 1 2-1 2 1V2l-2 1-2-1-2 1-2-1-2 1-2-1-2 1-2-1zM8 7h8M8 11h8M8 15h5")
}
fn icon_refresh_cw() -> Html {
    icon_base("M23 4v6h-6M1 20v-6h6M3.51 9a9 9 0 0114.85-3.36L23 10M1 14l4.64 4.36A9 9 0 0020.49 15")
}
fn icon_x() -> Html {
    icon_base("M18 6L6 18M6 6l12 12")
}
fn icon_maximize() -> Html {
    icon_base("M8 3H5a2 2 0 00-2 2v3M21 8V5a2 2 0 00-2-2h-3M3 16v3a2 2 0 002 2h3M16 21h3a2 2 0 002-2v-3")
}
fn icon_trash() -> Html {
    icon_base("M3 6h18M8 6V4a2 2 0 012-2h4a2 2 0 012 2v2M19 6v14a2 2 0 01-2 2H7a2 2 0 01-2-2V6")
}

fn main() {
    yew::Renderer::<App>::new().render();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_item(unit_price: i64, quantity: i64) -> LineItem {
        LineItem {
            no: "1".to_string(),
            name: "Milk".to_string(),
            barcode: None,
            unit_price,
            quantity,
            amount: unit_price * quantity,
        }
    }

    fn sample_ocr() -> OcrResponse {
        OcrResponse {
            success: true,
            error: None,
            items: vec![line_item(1000, 2), line_item(500, 3)],
            raw_text: "RAW".to_string(),
            store_name: Some("K-Mart".to_string()),
            card_name: Some("Shinhan".to_string()),
            purchase_date_time: Some("24-03-15 12:30".to_string()),
        }
    }

    #[test]
    fn digits_parsing_strips_noise() {
        assert_eq!(digits_to_int("1,200"), 1200);
        assert_eq!(digits_to_int("₩3,500 "), 3500);
        assert_eq!(digits_to_int(""), 0);
        assert_eq!(digits_to_int("abc"), 0);
    }

    #[test]
    fn unit_price_edit_recomputes_amount() {
        let mut item = line_item(1000, 3);
        item.apply_edit(EditField::UnitPrice, "1,500");
        assert_eq!(item.unit_price, 1500);
        assert_eq!(item.amount, 4500);
    }

    #[test]
    fn quantity_edit_recomputes_amount() {
        let mut item = line_item(1000, 3);
        item.apply_edit(EditField::Quantity, "5");
        assert_eq!(item.quantity, 5);
        assert_eq!(item.amount, 5000);
    }

    #[test]
    fn amount_override_never_touches_factors() {
        let mut item = line_item(1000, 2);
        item.apply_edit(EditField::Amount, "1,800");
        assert_eq!(item.amount, 1800);
        assert_eq!(item.unit_price, 1000);
        assert_eq!(item.quantity, 2);
        // the next factor edit re-derives the amount again
        item.apply_edit(EditField::UnitPrice, "700");
        assert_eq!(item.amount, 1400);
    }

    #[test]
    fn edit_sequences_keep_product_invariant() {
        let mut item = line_item(100, 1);
        let edits = [
            (EditField::UnitPrice, "250"),
            (EditField::Quantity, "4"),
            (EditField::UnitPrice, "0"),
            (EditField::Quantity, "7"),
        ];
        for (field, value) in edits {
            item.apply_edit(field, value);
            assert_eq!(item.amount, item.unit_price * item.quantity);
        }
    }

    #[test]
    fn name_edit_stored_verbatim() {
        let mut item = line_item(100, 1);
        item.apply_edit(EditField::Name, "  Organic Milk 1L ");
        assert_eq!(item.name, "  Organic Milk 1L ");
        assert_eq!(item.amount, 100);
    }

    #[test]
    fn invalid_numeric_input_defaults_to_zero() {
        let mut item = line_item(100, 2);
        item.apply_edit(EditField::UnitPrice, "-");
        assert_eq!(item.unit_price, 0);
        assert_eq!(item.amount, 0);
    }

    #[test]
    fn draft_refresh_only_while_pristine() {
        let first = sample_ocr();
        let mut draft = ReceiptDraft::from_ocr(&first);
        assert_eq!(draft.mode, DraftMode::Pristine);

        // pristine drafts follow the incoming payload
        let mut second = sample_ocr();
        second.items[0].name = "Bread".to_string();
        assert!(draft.refresh_from(&second));
        assert_eq!(draft.items[0].name, "Bread");

        // one edit latches the draft; re-supplying the original changes nothing
        draft.apply_edit(0, EditField::Name, "Butter");
        assert_eq!(draft.mode, DraftMode::Dirty);
        assert!(!draft.refresh_from(&first));
        assert_eq!(draft.items[0].name, "Butter");
    }

    #[test]
    fn draft_total_sums_amounts() {
        let draft = ReceiptDraft::from_ocr(&sample_ocr());
        assert_eq!(draft.total(), 3500);
    }

    #[test]
    fn draft_total_follows_amount_overrides() {
        let mut draft = ReceiptDraft::from_ocr(&sample_ocr());
        draft.apply_edit(0, EditField::Amount, "100");
        assert_eq!(draft.total(), 1600);
    }

    #[test]
    fn normalization_drops_empty_barcodes() {
        let mut data = sample_ocr();
        data.items[0].barcode = Some(String::new());
        data.items[1].barcode = Some("8801234567890".to_string());
        let request = ReceiptDraft::from_ocr(&data).to_save_request();
        assert_eq!(request.items[0].barcode, None);
        assert_eq!(
            request.items[1].barcode.as_deref(),
            Some("8801234567890")
        );
        assert_eq!(request.raw_text, "RAW");
    }

    #[test]
    fn save_payload_uses_camel_case_keys() {
        let request = ReceiptDraft::from_ocr(&sample_ocr()).to_save_request();
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("rawText").is_some());
        assert!(json.get("storeName").is_some());
        assert!(json.get("purchaseDateTime").is_some());
        assert!(json["items"][0].get("unitPrice").is_some());
    }

    #[test]
    fn save_status_happy_path() {
        let status = SaveStatus::Idle
            .step(SaveAction::Begin)
            .step(SaveAction::Succeed);
        assert_eq!(status, SaveStatus::Saved);
    }

    #[test]
    fn save_status_saved_is_terminal() {
        let status = SaveStatus::Saved;
        assert_eq!(status.step(SaveAction::Begin), SaveStatus::Saved);
        assert_eq!(status.step(SaveAction::Fail), SaveStatus::Saved);
        assert_eq!(status.step(SaveAction::Revert), SaveStatus::Saved);
        assert!(!status.can_edit());
        assert!(!status.can_save());
    }

    #[test]
    fn save_status_error_reverts_and_allows_retry() {
        let status = SaveStatus::Saving.step(SaveAction::Fail);
        assert_eq!(status, SaveStatus::Error);
        assert!(status.can_save());
        assert_eq!(status.step(SaveAction::Revert), SaveStatus::Idle);
    }

    #[test]
    fn save_status_saving_blocks_reentry() {
        let status = SaveStatus::Saving;
        assert!(!status.can_save());
        assert_eq!(status.step(SaveAction::Begin), SaveStatus::Saving);
        // a stale revert must not knock a running save back to idle
        assert_eq!(status.step(SaveAction::Revert), SaveStatus::Saving);
    }

    #[test]
    fn quick_ranges_from_reference_date() {
        let reference = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        let (start, end) = QuickRange::ThisMonth.bounds(reference);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(end, reference);

        // February 2024 is a leap month
        let (start, end) = QuickRange::LastMonth.bounds(reference);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let (start, end) = QuickRange::ThreeMonths.bounds(reference);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end, reference);

        let (start, end) = QuickRange::ThisYear.bounds(reference);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end, reference);
    }

    #[test]
    fn last_month_across_year_boundary() {
        let reference = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let (start, end) = QuickRange::LastMonth.bounds(reference);
        assert_eq!(start, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn date_param_uses_two_digit_year() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(format_date_param(date), "24-02-01");
    }

    #[test]
    fn receipt_query_includes_only_set_filters() {
        let query = ReceiptQuery {
            limit: 100,
            start_date: None,
            end_date: None,
            store_name: Some("Mart".to_string()),
            card_name: None,
            search: Some("milk".to_string()),
        };
        let params = query.query_params();
        let keys: Vec<&str> = params.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec!["limit", "store_name", "search"]);
        assert_eq!(params[0].1, "100");
        assert_eq!(params[1].1, "Mart");
        assert_eq!(params[2].1, "milk");
    }

    #[test]
    fn receipt_query_formats_date_filters() {
        let query = ReceiptQuery {
            limit: 20,
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 29),
            store_name: None,
            card_name: None,
            search: None,
        };
        let params = query.query_params();
        assert_eq!(params[1], ("start_date", "24-02-01".to_string()));
        assert_eq!(params[2], ("end_date", "24-02-29".to_string()));
    }

    #[test]
    fn comma_formatting() {
        assert_eq!(format_with_commas(0), "0");
        assert_eq!(format_with_commas(999), "999");
        assert_eq!(format_with_commas(1234567), "1,234,567");
        assert_eq!(format_with_commas(-45000), "-45,000");
        assert_eq!(format_currency(3500), "₩3,500");
    }

    #[test]
    fn purchase_datetime_badge_parsing() {
        let badge = date_badge(Some("26-02-14 13:45"));
        assert_eq!(badge.day, "14");
        assert_eq!(badge.month, "Feb");
        assert_eq!(badge.time, "13:45");

        let missing = date_badge(None);
        assert_eq!(missing.day, "-");
        assert_eq!(missing.month, "-");
        assert_eq!(missing.time, "");

        let garbage = date_badge(Some("not a date"));
        assert_eq!(garbage.day, "-");
    }

    #[test]
    fn purchase_datetime_long_format() {
        assert_eq!(
            format_purchase_datetime(Some("26-02-14 13:45")),
            "2026-02-14 13:45"
        );
        assert_eq!(format_purchase_datetime(None), "-");
        // unparseable values pass through untouched
        assert_eq!(format_purchase_datetime(Some("soon")), "soon");
    }

    #[test]
    fn percent_of_total() {
        assert_eq!(percent_of(2500, 10000), "25.0%");
        assert_eq!(percent_of(1, 0), "0%");
    }

    #[test]
    fn ocr_payload_round_trips_camel_case() {
        let raw = r#"{
            "success": true,
            "storeName": "K-Mart",
            "cardName": null,
            "items": [
                {"no": "001", "name": "Milk", "barcode": "880", "unitPrice": 1000, "quantity": 2, "amount": 2000}
            ],
            "rawText": "RAW",
            "purchaseDateTime": "25-02-02 14:30"
        }"#;
        let parsed: OcrResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.store_name.as_deref(), Some("K-Mart"));
        assert_eq!(parsed.card_name, None);
        assert_eq!(parsed.items[0].unit_price, 1000);
        assert_eq!(parsed.items[0].barcode.as_deref(), Some("880"));
    }
}
