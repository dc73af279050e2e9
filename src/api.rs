//! Client for the Nexus backend: accounts, onboarding profile and nutrition.
//!
//! Every endpoint is a JSON `POST` under the configured API base. Once a
//! login or registration succeeds, the returned token is kept and sent as a
//! bearer header on every later call. Endpoints that look data up by user
//! also get it in the body as `token`.

use std::sync::{Arc, RwLock};

use log::{debug, info};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ApiError;

/// Credential data for login and registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredentials {
    pub username: String,

    pub password: String,

    /// Only sent when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        UserCredentials {
            username: username.into(),
            password: password.into(),
            email: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    #[default]
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// A food diary entry as the user typed it
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionEntry {
    pub food_name: String,
    pub quantity: f64,
    /// Unit of `quantity`; converted to grams before sending
    pub unit: String,
    pub meal_type: MealType,
    /// Local time of day, `HH:MM`
    pub time: String,
}

/// Replacement values for an existing diary entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryEdit {
    pub food_name: String,
    pub quantity: f64,
    pub unit: String,
    pub time: String,
    pub meal_type: MealType,
}

/// Calories (kcal) and macronutrients (g)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Macros {
    /// Goals used when the user has not set their own
    pub const DEFAULT_GOALS: Macros = Macros {
        calories: 2200.0,
        protein: 110.0,
        carbs: 275.0,
        fat: 73.0,
    };
}

/// Today's intake against the user's goals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionSummary {
    pub goals: Macros,
    pub consumed: Macros,
}

/// Convert a quantity in a kitchen unit to grams
///
/// Volumes use water density. Unknown units are taken to be grams already.
pub fn to_grams(quantity: f64, unit: &str) -> f64 {
    let factor = match unit.trim().to_lowercase().as_str() {
        "kg" | "kilogram" | "kilograms" => 1000.0,
        "lb" | "pound" | "pounds" => 453.592,
        "oz" | "ounce" | "ounces" => 28.3495,
        "cup" | "cups" => 240.0,
        "tbsp" | "tablespoon" | "tablespoons" => 15.0,
        "tsp" | "teaspoon" | "teaspoons" => 5.0,
        _ => 1.0,
    };
    quantity * factor
}

/// Pick the most useful message out of a backend error body
///
/// Field validation errors come as arrays keyed by field name; the first
/// message of the first such field wins. Otherwise `message`, `error` and
/// `detail` are tried in that order.
pub fn rejection_message(body: &Value, status: u16) -> String {
    for field in ["username", "password", "email", "non_field_errors"] {
        if let Some(first) = body
            .get(field)
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
            .and_then(Value::as_str)
        {
            return first.to_string();
        }
    }

    ["message", "error", "detail"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

fn positive(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| *v > 0.0)
}

/// Build the summary from the goals and history responses
///
/// Goals that are missing or zero take their default. Missing totals are zero.
pub fn summarize(goals: &Value, history: &Value) -> NutritionSummary {
    let defaults = Macros::DEFAULT_GOALS;
    let totals = history.get("total_nutrition");
    let total = |key: &str| {
        totals
            .and_then(|t| t.get(key))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    };

    NutritionSummary {
        goals: Macros {
            calories: positive(goals.get("calories")).unwrap_or(defaults.calories),
            protein: positive(goals.get("protein")).unwrap_or(defaults.protein),
            carbs: positive(goals.get("carbs")).unwrap_or(defaults.carbs),
            fat: positive(goals.get("fat")).unwrap_or(defaults.fat),
        },
        consumed: Macros {
            calories: total("calories"),
            protein: total("protein"),
            carbs: total("carbs"),
            fat: total("fat"),
        },
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// # Arguments
    /// * `base` - API root, e.g. `http://127.0.0.1:8000/api`
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: impl Into<String>) -> Self {
        let base: String = base.into();
        ApiClient {
            client,
            base: base.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// The stored session token, if logged in
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// POST `body` to `endpoint` and decode the JSON answer
    ///
    /// # Returns
    /// * `Ok(Value)` - Response body, `Null` when empty
    /// * `Err(ApiError::Rejected)` - Non-2xx answer with the backend's message
    pub async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base, endpoint);
        debug!("POST {}", url);

        let mut request = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(body);
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::Null);
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body, status.as_u16()),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// `body` with the session token added, for endpoints that need it
    fn authed(&self, body: Value) -> Result<Value, ApiError> {
        let token = self.token().ok_or(ApiError::MissingToken)?;
        let mut fields = match body {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.insert("token".to_string(), Value::String(token));
        Ok(Value::Object(fields))
    }

    async fn authenticate(
        &self,
        endpoint: &str,
        credentials: &UserCredentials,
    ) -> Result<Value, ApiError> {
        let response = self
            .post(endpoint, &serde_json::to_value(credentials)?)
            .await?;

        if let Some(token) = response.get("tokens").and_then(Value::as_str) {
            info!("signed in as {}", credentials.username);
            self.set_token(Some(token.to_string()));
        }
        Ok(response)
    }

    pub async fn login(&self, credentials: &UserCredentials) -> Result<Value, ApiError> {
        self.authenticate("login/", credentials).await
    }

    pub async fn register(&self, credentials: &UserCredentials) -> Result<Value, ApiError> {
        self.authenticate("register/", credentials).await
    }

    /// Forget the session token. Nothing is sent to the backend.
    pub fn logout(&self) {
        self.set_token(None);
    }

    pub async fn store_basic_info(&self, data: &Value) -> Result<Value, ApiError> {
        self.post("basic-info/store/", data).await
    }

    pub async fn store_health_profile(&self, data: &Value) -> Result<Value, ApiError> {
        self.post("health-profile/store/", data).await
    }

    pub async fn get_basic_info(&self) -> Result<Value, ApiError> {
        self.post("basic-info/get/", &self.authed(json!({}))?).await
    }

    pub async fn update_basic_info(&self, data: &Value) -> Result<Value, ApiError> {
        self.post("basic-info/update/", &self.authed(data.clone())?)
            .await
    }

    pub async fn get_health_profile(&self) -> Result<Value, ApiError> {
        self.post("health-profile/get/", &self.authed(json!({}))?)
            .await
    }

    pub async fn update_health_profile(&self, data: &Value) -> Result<Value, ApiError> {
        self.post("health-profile/update/", &self.authed(data.clone())?)
            .await
    }

    /// Add a diary entry; the quantity is sent as whole grams
    pub async fn log_nutrition(&self, entry: &NutritionEntry) -> Result<Value, ApiError> {
        let body = json!({
            "food_name": entry.food_name,
            "quantity": to_grams(entry.quantity, &entry.unit).round(),
            "meal_type": entry.meal_type,
            "time": entry.time,
        });
        self.post("nutrition/", &self.authed(body)?).await
    }

    /// Nutrition for a food without adding it to the diary
    pub async fn preview_nutrition(
        &self,
        food_name: &str,
        quantity: f64,
        unit: &str,
    ) -> Result<Value, ApiError> {
        let body = json!({
            "food_name": food_name,
            "quantity": to_grams(quantity, unit).round(),
        });
        self.post("nutrition/preview/", &self.authed(body)?).await
    }

    pub async fn search_foods(&self, query: &str) -> Result<Value, ApiError> {
        self.post("nutrition/search/", &json!({ "query": query }))
            .await
    }

    pub async fn get_nutrition_history(&self) -> Result<Value, ApiError> {
        self.post("nutrition/", &self.authed(json!({}))?).await
    }

    pub async fn get_nutrition_goals(&self) -> Result<Value, ApiError> {
        self.post("nutrition/goals/", &self.authed(json!({}))?).await
    }

    pub async fn set_nutrition_goals(&self, goals: &Macros) -> Result<Value, ApiError> {
        self.post("nutrition/goals/", &self.authed(serde_json::to_value(goals)?)?)
            .await
    }

    /// Today's consumption against goals, with default goals filled in
    pub async fn get_nutrition_summary(&self) -> Result<NutritionSummary, ApiError> {
        let goals = self.get_nutrition_goals().await?;
        let history = self.get_nutrition_history().await?;
        Ok(summarize(&goals, &history))
    }

    pub async fn delete_entry(&self, id: i64) -> Result<Value, ApiError> {
        self.post("nutrition/delete/", &json!({ "id": id })).await
    }

    pub async fn edit_entry(&self, id: i64, edit: &EntryEdit) -> Result<Value, ApiError> {
        let mut body = serde_json::to_value(edit)?;
        if let Value::Object(fields) = &mut body {
            fields.insert("id".to_string(), json!(id));
        }
        self.post("nutrition/edit/", &body).await
    }
}
