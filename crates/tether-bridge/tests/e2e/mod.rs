mod classes;
mod debugging;
mod exceptions;
mod harness;
mod lifetime;
