// Domain layer - Dashboard definitions, catalogs and backend response models
pub mod catalog;
pub mod dashboard;
pub mod prometheus;
