mod fake_backend;
mod status_placement;
