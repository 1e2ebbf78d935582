//! HTTP request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::{Result, ServerError};
use super::state::AppState;
use crate::inference::{PredictionResult, Record};

// ============================================================================
// Prediction Handlers
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinglePredictionRequest {
    pub data: Record,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPredictionRequest {
    pub data: Vec<Record>,
}

pub async fn predict_single(
    State(state): State<Arc<AppState>>,
    request: std::result::Result<Json<SinglePredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>> {
    let Json(request) = request?;
    let result = state.service.predict_single(&request.data)?;
    Ok(Json(result))
}

pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    request: std::result::Result<Json<BatchPredictionRequest>, JsonRejection>,
) -> Result<Json<Vec<PredictionResult>>> {
    let Json(request) = request?;
    // large batches are CPU-bound; keep them off the async workers
    let service = Arc::clone(&state.service);
    let results = tokio::task::spawn_blocking(move || service.predict_batch(&request.data))
        .await
        .map_err(|e| ServerError::Internal(format!("prediction task failed: {}", e)))??;
    let churners = results.iter().filter(|r| r.prediction == 1).count();
    info!(rows = results.len(), churners, "Batch prediction served");
    Ok(Json(results))
}

// ============================================================================
// Root & Health
// ============================================================================

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the Telco Customer Churn Prediction API.",
        "usage": {
            "single": "/predict/single",
            "batch": "/predict/batch",
            "health": "/health",
            "ui": "/ui",
        },
    }))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================================
// UI Handler
// ============================================================================

pub async fn serve_ui() -> Html<&'static str> {
    Html(EMBEDDED_UI_HTML)
}

const EMBEDDED_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Telco Customer Churn Prediction</title>
    <style>
        body { font-family: system-ui, sans-serif; background: #111827; color: #f3f4f6; max-width: 720px; margin: 2rem auto; padding: 0 1rem; }
        h1 { font-size: 1.5rem; }
        form { display: grid; grid-template-columns: 1fr 1fr; gap: 1rem; }
        label { display: flex; flex-direction: column; font-size: 0.875rem; gap: 0.25rem; }
        input, select { padding: 0.5rem; border-radius: 0.375rem; border: 1px solid #374151; background: #1f2937; color: inherit; }
        button { grid-column: span 2; padding: 0.75rem; border: none; border-radius: 0.375rem; background: #3b82f6; color: white; cursor: pointer; }
        pre { background: #1f2937; padding: 1rem; border-radius: 0.375rem; min-height: 3rem; }
    </style>
</head>
<body>
    <h1>Telco Customer Churn Prediction</h1>
    <p>Enter customer attributes to predict the probability of churn.</p>
    <form id="predict-form">
        <label>Customer ID <input name="customerID" placeholder="1234-ABCD"></label>
        <label>Gender
            <select name="gender"><option>Male</option><option>Female</option></select>
        </label>
        <label>Senior Citizen <input name="SeniorCitizen" type="checkbox"></label>
        <label>Tenure (months) <input name="tenure" type="number" min="0" value="0"></label>
        <label>Monthly Charges <input name="MonthlyCharges" type="number" step="0.01" value="0"></label>
        <label>Total Charges <input name="TotalCharges" type="number" step="0.01" value="0"></label>
        <label>Contract
            <select name="Contract"><option>Month-to-month</option><option>One year</option><option>Two year</option></select>
        </label>
        <label>Internet Service
            <select name="InternetService"><option>DSL</option><option>Fiber optic</option><option>No</option></select>
        </label>
        <button type="submit">Predict</button>
    </form>
    <h2>Prediction Result</h2>
    <pre id="result"></pre>
    <script>
        const form = document.getElementById('predict-form');
        const out = document.getElementById('result');
        form.addEventListener('submit', async (event) => {
            event.preventDefault();
            const f = form.elements;
            const data = {
                customerID: f.customerID.value,
                gender: f.gender.value,
                SeniorCitizen: f.SeniorCitizen.checked ? 1 : 0,
                tenure: parseInt(f.tenure.value || '0', 10),
                MonthlyCharges: parseFloat(f.MonthlyCharges.value || '0'),
                TotalCharges: parseFloat(f.TotalCharges.value || '0'),
                Contract: f.Contract.value,
                InternetService: f.InternetService.value,
            };
            try {
                const res = await fetch('/predict/single', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ data }),
                });
                out.textContent = JSON.stringify(await res.json(), null, 2);
            } catch (err) {
                out.textContent = JSON.stringify({ error: String(err) }, null, 2);
            }
        });
    </script>
</body>
</html>
"#;
