// 外部系統的具體實作：HTTP client、地理編碼、檔案儲存
pub mod geocoder;
pub mod http;
pub mod id_files;
pub mod storage;
