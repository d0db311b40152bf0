// Copyright 2024 The stackwalk-diff Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub trait Truncate {
    fn truncate_chars(&self, max: usize) -> String;
}

impl<T> Truncate for T
where
    T: AsRef<str> + ?Sized,
{
    fn truncate_chars(&self, max: usize) -> String {
        self.as_ref().chars().take(max).collect()
    }
}
