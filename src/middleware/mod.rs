/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: credential → identity → allow-list の pipeline
 * - cors / http: 横断的な HTTP 関心事
 */
pub mod auth;
pub mod cors;
pub mod http;
