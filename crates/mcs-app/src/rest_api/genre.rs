use crate::{crud_api, value_router};
use mcs_dal::genre::{CreateGenre, GenreRepository, PatchGenre};

crud_api!(Genre, "/api/genre");

value_router!();
